//! Payment provider adapters

pub mod signature;
pub mod snap;

pub use signature::{notification_signature, verify_notification_signature};
pub use snap::{SnapConfig, SnapGateway};
