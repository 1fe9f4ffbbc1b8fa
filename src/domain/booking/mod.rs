//! Booking aggregate
//!
//! Contains the Booking entity, its frozen items, and repository interface.

pub mod model;
pub mod repository;

pub use model::{Booking, BookingCode, BookingItem, BookingStatus};
pub use repository::BookingRepository;
