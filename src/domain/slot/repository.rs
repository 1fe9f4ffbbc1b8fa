//! Slot repository interface
//!
//! Every state-changing method is a single atomic step in the backing store;
//! the ledger service never reads a slot and writes it back in two calls.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use super::model::{HoldAttempt, HoldId, NewSlot, Slot, SlotKey};
use crate::shared::errors::DomainResult;

#[async_trait]
pub trait SlotRepository: Send + Sync {
    /// Slots of one court ordered by date then start minute, optionally for a
    /// single date.
    async fn list_for_court(
        &self,
        court_id: i32,
        date: Option<NaiveDate>,
    ) -> DomainResult<Vec<Slot>>;

    /// Find a slot by its key
    async fn find(&self, key: &SlotKey) -> DomainResult<Option<Slot>>;

    /// Create slots whose key does not exist yet. Returns how many were inserted.
    async fn insert_missing(&self, slots: &[NewSlot]) -> DomainResult<u64>;

    /// Move every key free → held under `hold_id`, or change nothing.
    async fn hold(
        &self,
        keys: &[SlotKey],
        hold_id: HoldId,
        expires_at: DateTime<Utc>,
    ) -> DomainResult<HoldAttempt>;

    /// Move every key held-by-`hold_id` (deadline after `now`) → booked, or
    /// change nothing. Returns `false` when any key failed the check.
    async fn commit_hold(
        &self,
        hold_id: HoldId,
        keys: &[SlotKey],
        now: DateTime<Utc>,
    ) -> DomainResult<bool>;

    /// held → free for keys still held by `hold_id`. Returns rows changed.
    async fn release_hold(&self, hold_id: HoldId, keys: &[SlotKey]) -> DomainResult<u64>;

    /// booked → free for keys booked under `hold_id`. Returns rows changed.
    async fn release_booked(&self, hold_id: HoldId, keys: &[SlotKey]) -> DomainResult<u64>;

    /// held → free for every hold whose deadline is at or before `now`.
    async fn release_expired_holds(&self, now: DateTime<Utc>) -> DomainResult<u64>;
}
