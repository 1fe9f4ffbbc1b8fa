//! Shared HTTP plumbing: response envelope, error mapping, validated JSON

pub mod error;
pub mod response;
pub mod validated_json;

pub use error::ApiError;
pub use response::ApiResponse;
pub use validated_json::ValidatedJson;
