//! Court aggregate

pub mod model;
pub mod repository;

pub use model::{Court, CourtImage, NewCourt};
pub use repository::CourtRepository;
