//! Checkout and booking lookups

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
