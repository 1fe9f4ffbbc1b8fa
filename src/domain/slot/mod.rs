//! Slot aggregate
//!
//! Contains the Slot entity, hold handles, and repository interface.

pub mod model;
pub mod repository;

pub use model::{format_minute, HeldSet, HoldAttempt, HoldId, NewSlot, Slot, SlotKey, SlotStatus};
pub use repository::SlotRepository;
