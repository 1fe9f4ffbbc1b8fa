//! Database entities module

pub mod booking;
pub mod booking_item;
pub mod court;
pub mod court_image;
pub mod slot;

pub use booking::Entity as Booking;
pub use booking_item::Entity as BookingItem;
pub use court::Entity as Court;
pub use court_image::Entity as CourtImage;
pub use slot::Entity as Slot;
