//! Domain layer: courts, slots, bookings and the payment vocabulary.
//!
//! Nothing here knows about HTTP or SQL; storage is reached through the
//! repository traits collected by [`RepositoryProvider`].

pub mod booking;
pub mod court;
pub mod payment;
pub mod repositories;
pub mod slot;

pub use booking::{Booking, BookingCode, BookingItem, BookingRepository, BookingStatus};
pub use court::{Court, CourtImage, CourtRepository, NewCourt};
pub use payment::{
    CustomerDetails, FraudStatus, GatewayError, LineItem, PaymentGateway, PaymentIntent,
    PaymentIntentRequest, PaymentNotification, TransactionStatus,
};
pub use repositories::RepositoryProvider;
pub use slot::{format_minute, HeldSet, HoldAttempt, HoldId, NewSlot, Slot, SlotKey, SlotRepository, SlotStatus};

pub use crate::shared::errors::{DomainError, DomainResult};
