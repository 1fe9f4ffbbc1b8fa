pub mod bookings;
pub mod courts;
pub mod health;
pub mod metrics;
pub mod payments;
pub mod request_id;
