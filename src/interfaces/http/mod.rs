//! HTTP REST API
//!
//! - `common`: response envelope, error mapping and the validating extractor
//! - `modules`: handlers and DTOs per resource
//! - `router`: route table, middleware stack and Swagger UI

pub mod common;
pub mod modules;
pub mod router;

#[cfg(test)]
mod tests;

pub use router::{create_api_router, ApiDoc, ApiOptions};
