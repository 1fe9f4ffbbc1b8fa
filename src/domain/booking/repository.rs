//! Booking repository interface

use async_trait::async_trait;

use super::model::{Booking, BookingStatus};
use crate::shared::errors::DomainResult;

#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Persist a booking and its items atomically, returning it with its id.
    ///
    /// Fails with `DomainError::Conflict` when the code is already taken.
    async fn insert(&self, booking: &Booking) -> DomainResult<Booking>;

    /// Find booking (with items) by its order code
    async fn find_by_code(&self, code: &str) -> DomainResult<Option<Booking>>;

    /// Most recent bookings first
    async fn list_recent(&self, limit: u64) -> DomainResult<Vec<Booking>>;

    /// Set status to `next` only if it is currently `expected`.
    /// Returns `false` when the booking was not in `expected`.
    async fn compare_and_set_status(
        &self,
        code: &str,
        expected: BookingStatus,
        next: BookingStatus,
    ) -> DomainResult<bool>;
}
