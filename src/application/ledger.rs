//! Slot ledger service
//!
//! Authoritative free → held → booked bookkeeping. Every call is one atomic
//! step in the backing store, bounded by the operation timeout.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::{
    DomainError, DomainResult, HeldSet, HoldAttempt, HoldId, RepositoryProvider, SlotKey,
};

#[derive(Debug, Clone, Copy)]
pub struct LedgerConfig {
    /// How long a hold survives without a commit
    pub hold_ttl: Duration,
    /// Upper bound for every single storage step
    pub operation_timeout: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            hold_ttl: Duration::from_secs(15 * 60),
            operation_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("slot not available: {first_unavailable}")]
    Conflict { first_unavailable: SlotKey },

    #[error("no such slot: {0}")]
    UnknownSlot(SlotKey),

    #[error("invalid slot selection: {0}")]
    InvalidSelection(String),

    #[error("hold {0} is no longer valid")]
    InvalidHandle(HoldId),

    #[error("ledger operation timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Storage(DomainError),
}

pub struct SlotLedger {
    repos: Arc<dyn RepositoryProvider>,
    config: LedgerConfig,
}

impl SlotLedger {
    pub fn new(repos: Arc<dyn RepositoryProvider>, config: LedgerConfig) -> Self {
        Self { repos, config }
    }

    pub fn config(&self) -> LedgerConfig {
        self.config
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = DomainResult<T>>,
    ) -> Result<T, LedgerError> {
        match tokio::time::timeout(self.config.operation_timeout, fut).await {
            Ok(result) => result.map_err(LedgerError::Storage),
            Err(_) => {
                warn!(operation, timeout = ?self.config.operation_timeout, "Ledger operation timed out");
                Err(LedgerError::Timeout(self.config.operation_timeout))
            }
        }
    }

    /// Claim every slot in `keys` or none of them.
    ///
    /// Keys are validated, sorted and de-duplicated first so concurrent holds
    /// always touch rows in the same order.
    pub async fn try_hold(&self, keys: &[SlotKey]) -> Result<HeldSet, LedgerError> {
        if keys.is_empty() {
            return Err(LedgerError::InvalidSelection(
                "at least one slot is required".to_string(),
            ));
        }
        for key in keys {
            key.validate()
                .map_err(|e| LedgerError::InvalidSelection(e.to_string()))?;
        }

        let mut keys = keys.to_vec();
        keys.sort();
        keys.dedup();

        let hold_id = HoldId::new();
        let ttl = chrono::Duration::from_std(self.config.hold_ttl)
            .unwrap_or_else(|_| chrono::Duration::minutes(15));
        let expires_at = Utc::now() + ttl;

        let attempt = self
            .bounded("hold", self.repos.slots().hold(&keys, hold_id, expires_at))
            .await?;

        match attempt {
            HoldAttempt::Held(slots) => {
                debug!(hold = %hold_id, slots = keys.len(), expires_at = %expires_at, "Slots held");
                Ok(HeldSet {
                    id: hold_id,
                    keys,
                    expires_at,
                    slots,
                })
            }
            HoldAttempt::Unavailable(key) => {
                info!(slot = %key, "Slot contention: hold refused");
                metrics::counter!("slot_conflicts_total").increment(1);
                Err(LedgerError::Conflict {
                    first_unavailable: key,
                })
            }
            HoldAttempt::Unknown(key) => Err(LedgerError::UnknownSlot(key)),
        }
    }

    /// held → booked for the whole set; fails when any slot lost the hold.
    pub async fn commit(&self, held: &HeldSet) -> Result<(), LedgerError> {
        let committed = self
            .bounded(
                "commit",
                self.repos.slots().commit_hold(held.id, &held.keys, Utc::now()),
            )
            .await?;

        if !committed {
            info!(hold = %held.id, "Hold no longer valid at commit");
            return Err(LedgerError::InvalidHandle(held.id));
        }
        debug!(hold = %held.id, slots = held.keys.len(), "Hold committed");
        Ok(())
    }

    /// held → free for the slots this hold still owns. Safe to repeat.
    pub async fn release(&self, held: &HeldSet) -> Result<u64, LedgerError> {
        let released = self
            .bounded(
                "release",
                self.repos.slots().release_hold(held.id, &held.keys),
            )
            .await?;
        if released > 0 {
            metrics::counter!("slots_released_total", "reason" => "hold_released")
                .increment(released);
            debug!(hold = %held.id, released, "Hold released");
        }
        Ok(released)
    }

    /// booked → free for slots booked under `hold_id`. Safe to repeat.
    pub async fn release_booked(
        &self,
        hold_id: HoldId,
        keys: &[SlotKey],
    ) -> Result<u64, LedgerError> {
        let released = self
            .bounded(
                "release_booked",
                self.repos.slots().release_booked(hold_id, keys),
            )
            .await?;
        if released > 0 {
            metrics::counter!("slots_released_total", "reason" => "booking_failed")
                .increment(released);
            info!(hold = %hold_id, released, "Booked slots returned to free");
        }
        Ok(released)
    }

    /// Free every hold whose deadline is at or before `now`.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<u64, LedgerError> {
        let released = self
            .bounded("sweep", self.repos.slots().release_expired_holds(now))
            .await?;
        if released > 0 {
            metrics::counter!("slots_released_total", "reason" => "hold_expired")
                .increment(released);
            info!(released, "Expired holds swept");
        }
        Ok(released)
    }
}
