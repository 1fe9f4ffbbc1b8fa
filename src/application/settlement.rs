//! Settlement reconciler
//!
//! Applies provider callbacks to bookings. Delivery is at-least-once and
//! unordered, so every step here is idempotent: notifications for one order
//! code are serialized in-process, and the status write is a compare-and-set
//! from `pending` that only one writer can win across processes.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use super::checkout::InFlightCheckouts;
use super::ledger::{LedgerError, SlotLedger};
use crate::domain::{Booking, BookingStatus, DomainError, PaymentNotification, RepositoryProvider};

/// What a notification did to its booking
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppliedOutcome {
    /// pending → `new_status`
    Applied { new_status: BookingStatus },
    /// Target was pending; nothing to do
    Unchanged,
    /// Booking was already terminal; duplicates and late arrivals land here
    Ignored { current: BookingStatus },
}

impl AppliedOutcome {
    fn label(&self) -> &'static str {
        match self {
            Self::Applied {
                new_status: BookingStatus::Paid,
            } => "paid",
            Self::Applied { .. } => "failed",
            Self::Unchanged => "unchanged",
            Self::Ignored { .. } => "ignored",
        }
    }
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("unknown order: {0}")]
    UnknownOrder(String),

    #[error("notification processing timed out after {0:?}")]
    Timeout(Duration),

    /// The checkout for this code has not written its booking yet
    #[error("checkout still in progress for order {0}")]
    CheckoutInProgress(String),

    #[error(transparent)]
    Storage(DomainError),
}

impl NotificationError {
    fn label(&self) -> &'static str {
        match self {
            Self::UnknownOrder(_) => "unknown_order",
            Self::Timeout(_) => "timeout",
            Self::CheckoutInProgress(_) => "in_progress",
            Self::Storage(_) => "storage_error",
        }
    }
}

pub struct SettlementReconciler {
    repos: Arc<dyn RepositoryProvider>,
    ledger: Arc<SlotLedger>,
    /// One async mutex per order code with a notification in flight
    locks: DashMap<String, Arc<Mutex<()>>>,
    checkouts: InFlightCheckouts,
    timeout: Duration,
}

impl SettlementReconciler {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        ledger: Arc<SlotLedger>,
        checkouts: InFlightCheckouts,
        timeout: Duration,
    ) -> Self {
        Self {
            repos,
            ledger,
            locks: DashMap::new(),
            checkouts,
            timeout,
        }
    }

    pub async fn apply_notification(
        &self,
        notification: &PaymentNotification,
    ) -> Result<AppliedOutcome, NotificationError> {
        let code = notification.order_id.as_str();
        let lock = self
            .locks
            .entry(code.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let result = {
            let _guard = lock.lock().await;
            match tokio::time::timeout(self.timeout, self.apply_locked(notification)).await {
                Ok(result) => result,
                Err(_) => Err(NotificationError::Timeout(self.timeout)),
            }
        };

        drop(lock);
        // Nobody else waiting: the map's own reference is the last one.
        self.locks.remove_if(code, |_, l| Arc::strong_count(l) == 1);

        let outcome = match &result {
            Ok(applied) => applied.label(),
            Err(e) => e.label(),
        };
        metrics::counter!("payment_notifications_total", "outcome" => outcome).increment(1);
        result
    }

    async fn apply_locked(
        &self,
        notification: &PaymentNotification,
    ) -> Result<AppliedOutcome, NotificationError> {
        let code = notification.order_id.as_str();
        let found = self
            .repos
            .bookings()
            .find_by_code(code)
            .await
            .map_err(NotificationError::Storage)?;
        let booking = match found {
            Some(booking) => booking,
            None if self.checkouts.contains(code) => {
                info!(code, "Notification arrived before its booking was stored; asking for a retry");
                return Err(NotificationError::CheckoutInProgress(code.to_string()));
            }
            None => return Err(NotificationError::UnknownOrder(code.to_string())),
        };

        let target = notification.target_status();
        debug!(
            code,
            transaction_status = %notification.transaction_status,
            current = %booking.status,
            target = %target,
            "Applying payment notification"
        );

        if booking.status.is_terminal() {
            if booking.status == BookingStatus::Failed {
                // A redelivery finishes a release that an earlier attempt
                // could not complete; a no-op otherwise.
                self.release_slots(&booking).await?;
            }
            info!(code, current = %booking.status, incoming = %notification.transaction_status, "Notification for settled booking ignored");
            return Ok(AppliedOutcome::Ignored {
                current: booking.status,
            });
        }

        // Still pending here, so only a non-final target is refused.
        if !booking.status.can_transition_to(target) {
            info!(code, transaction_status = %notification.transaction_status, "Notification leaves booking pending");
            return Ok(AppliedOutcome::Unchanged);
        }

        let won = self
            .repos
            .bookings()
            .compare_and_set_status(code, BookingStatus::Pending, target)
            .await
            .map_err(NotificationError::Storage)?;

        if !won {
            let current = self
                .repos
                .bookings()
                .find_by_code(code)
                .await
                .map_err(NotificationError::Storage)?
                .map(|b| b.status)
                .unwrap_or(target);
            info!(code, current = %current, "Booking changed concurrently; notification ignored");
            return Ok(AppliedOutcome::Ignored { current });
        }

        if target == BookingStatus::Failed {
            self.release_slots(&booking).await?;
        }

        info!(code, status = %target, total = booking.total, "💳 Booking status updated");
        Ok(AppliedOutcome::Applied { new_status: target })
    }

    async fn release_slots(&self, booking: &Booking) -> Result<(), NotificationError> {
        match self
            .ledger
            .release_booked(booking.hold_id, &booking.slot_keys())
            .await
        {
            Ok(_) => Ok(()),
            Err(e) => {
                error!(code = %booking.code, hold = %booking.hold_id, error = %e, "Failed to release slots of failed booking");
                Err(match e {
                    LedgerError::Timeout(after) => NotificationError::Timeout(after),
                    LedgerError::Storage(e) => NotificationError::Storage(e),
                    other => NotificationError::Storage(DomainError::storage(other)),
                })
            }
        }
    }

    #[cfg(test)]
    fn locked_codes(&self) -> usize {
        self.locks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::checkout::{CheckoutConfig, CheckoutItem, ReservationCoordinator};
    use crate::application::ledger::LedgerConfig;
    use crate::application::testing::{
        day, hour_key, seeded_repos, FakeGateway, FakeMode, StallingRepos,
    };
    use crate::domain::SlotStatus;

    struct Harness {
        repos: Arc<dyn RepositoryProvider>,
        coordinator: Arc<ReservationCoordinator>,
        reconciler: Arc<SettlementReconciler>,
    }

    async fn harness() -> Harness {
        harness_on(
            seeded_repos().await,
            FakeGateway::approving(),
            LedgerConfig::default(),
        )
    }

    fn harness_on(
        repos: Arc<dyn RepositoryProvider>,
        gateway: Arc<FakeGateway>,
        config: LedgerConfig,
    ) -> Harness {
        let ledger = Arc::new(SlotLedger::new(repos.clone(), config));
        let coordinator = ReservationCoordinator::new(
            repos.clone(),
            ledger.clone(),
            gateway,
            CheckoutConfig::default(),
        );
        Harness {
            reconciler: Arc::new(SettlementReconciler::new(
                repos.clone(),
                ledger,
                coordinator.in_flight(),
                config.operation_timeout,
            )),
            coordinator: Arc::new(coordinator),
            repos,
        }
    }

    impl Harness {
        async fn book(&self, hours: &[i32]) -> String {
            let items = hours
                .iter()
                .map(|h| CheckoutItem {
                    court_id: 1,
                    date: day(),
                    start_min: h * 60,
                    end_min: (h + 1) * 60,
                    price: 90_000,
                })
                .collect();
            self.coordinator.checkout(items).await.unwrap().booking.code
        }

        async fn notify(&self, code: &str, tx: &str, fraud: Option<&str>) -> AppliedOutcome {
            self.reconciler
                .apply_notification(&PaymentNotification::parse(code, tx, fraud))
                .await
                .unwrap()
        }

        async fn status(&self, code: &str) -> BookingStatus {
            self.repos
                .bookings()
                .find_by_code(code)
                .await
                .unwrap()
                .unwrap()
                .status
        }

        async fn slot(&self, hour: i32) -> SlotStatus {
            self.repos
                .slots()
                .find(&hour_key(hour))
                .await
                .unwrap()
                .unwrap()
                .status
        }
    }

    #[tokio::test]
    async fn settlement_pays_and_repeats_are_ignored() {
        let h = harness().await;
        let code = h.book(&[7]).await;

        assert_eq!(
            h.notify(&code, "settlement", None).await,
            AppliedOutcome::Applied {
                new_status: BookingStatus::Paid
            }
        );
        assert_eq!(
            h.notify(&code, "settlement", None).await,
            AppliedOutcome::Ignored {
                current: BookingStatus::Paid
            }
        );
        assert_eq!(h.status(&code).await, BookingStatus::Paid);
        assert_eq!(h.slot(7).await, SlotStatus::Booked);
        assert_eq!(h.reconciler.locked_codes(), 0);
    }

    #[tokio::test]
    async fn expiry_fails_booking_and_frees_slots_for_rebooking() {
        let h = harness().await;
        let code = h.book(&[7, 8]).await;

        assert_eq!(
            h.notify(&code, "expire", None).await,
            AppliedOutcome::Applied {
                new_status: BookingStatus::Failed
            }
        );
        assert_eq!(h.slot(7).await, SlotStatus::Free);
        assert_eq!(h.slot(8).await, SlotStatus::Free);

        // late settlement cannot resurrect a failed booking
        assert_eq!(
            h.notify(&code, "settlement", None).await,
            AppliedOutcome::Ignored {
                current: BookingStatus::Failed
            }
        );
        assert_eq!(h.status(&code).await, BookingStatus::Failed);

        let again = h.book(&[7]).await;
        assert_ne!(again, code);
        assert_eq!(h.slot(7).await, SlotStatus::Booked);

        // redelivered failure must not free the new booking's slot
        h.notify(&code, "cancel", None).await;
        assert_eq!(h.slot(7).await, SlotStatus::Booked);
    }

    #[tokio::test]
    async fn paid_never_becomes_failed() {
        let h = harness().await;
        let code = h.book(&[7]).await;

        h.notify(&code, "capture", Some("accept")).await;
        assert_eq!(
            h.notify(&code, "deny", None).await,
            AppliedOutcome::Ignored {
                current: BookingStatus::Paid
            }
        );
        assert_eq!(h.status(&code).await, BookingStatus::Paid);
        assert_eq!(h.slot(7).await, SlotStatus::Booked);
    }

    #[tokio::test]
    async fn non_final_statuses_leave_booking_pending() {
        let h = harness().await;
        let code = h.book(&[7]).await;

        assert_eq!(h.notify(&code, "pending", None).await, AppliedOutcome::Unchanged);
        assert_eq!(
            h.notify(&code, "capture", Some("challenge")).await,
            AppliedOutcome::Unchanged
        );
        assert_eq!(h.notify(&code, "refund", None).await, AppliedOutcome::Unchanged);
        assert_eq!(h.status(&code).await, BookingStatus::Pending);
    }

    #[tokio::test]
    async fn unknown_order_is_reported() {
        let h = harness().await;
        let err = h
            .reconciler
            .apply_notification(&PaymentNotification::parse("RESV-NOPE", "settlement", None))
            .await
            .unwrap_err();
        assert!(matches!(err, NotificationError::UnknownOrder(code) if code == "RESV-NOPE"));
        assert_eq!(h.reconciler.locked_codes(), 0);
    }

    #[tokio::test]
    async fn concurrent_duplicate_failures_apply_once() {
        let h = harness().await;
        let code = h.book(&[7, 8]).await;

        let mut tasks = Vec::new();
        for _ in 0..10 {
            let reconciler = h.reconciler.clone();
            let notification = PaymentNotification::parse(code.clone(), "expire", None);
            tasks.push(tokio::spawn(async move {
                reconciler.apply_notification(&notification).await
            }));
        }

        let mut applied = 0;
        for task in tasks {
            match task.await.unwrap().unwrap() {
                AppliedOutcome::Applied { .. } => applied += 1,
                AppliedOutcome::Ignored { current } => assert_eq!(current, BookingStatus::Failed),
                AppliedOutcome::Unchanged => panic!("expire must not leave booking pending"),
            }
        }
        assert_eq!(applied, 1);
        assert_eq!(h.slot(7).await, SlotStatus::Free);
        assert_eq!(h.reconciler.locked_codes(), 0);
    }

    #[tokio::test]
    async fn stalled_lookup_times_out_and_retry_applies() {
        let stalling = StallingRepos::wrap(seeded_repos().await, Duration::from_millis(300));
        let h = harness_on(
            stalling.clone(),
            FakeGateway::approving(),
            LedgerConfig {
                operation_timeout: Duration::from_millis(50),
                ..LedgerConfig::default()
            },
        );
        let code = h.book(&[7]).await;

        stalling.stall("find_by_code");
        let err = h
            .reconciler
            .apply_notification(&PaymentNotification::parse(code.clone(), "expire", None))
            .await
            .unwrap_err();
        assert!(matches!(err, NotificationError::Timeout(d) if d == Duration::from_millis(50)));
        assert_eq!(h.reconciler.locked_codes(), 0);

        stalling.resume("find_by_code");
        assert_eq!(h.status(&code).await, BookingStatus::Pending);
        assert_eq!(h.slot(7).await, SlotStatus::Booked);

        assert_eq!(
            h.notify(&code, "expire", None).await,
            AppliedOutcome::Applied {
                new_status: BookingStatus::Failed
            }
        );
        assert_eq!(h.slot(7).await, SlotStatus::Free);
    }

    #[tokio::test]
    async fn notification_racing_its_checkout_asks_for_retry() {
        let gateway = Arc::new(FakeGateway::new(FakeMode::Slow(Duration::from_millis(200))));
        let h = harness_on(seeded_repos().await, gateway.clone(), LedgerConfig::default());

        let task = tokio::spawn({
            let coordinator = h.coordinator.clone();
            async move {
                coordinator
                    .checkout(vec![CheckoutItem {
                        court_id: 1,
                        date: day(),
                        start_min: 7 * 60,
                        end_min: 8 * 60,
                        price: 90_000,
                    }])
                    .await
            }
        });
        let code = loop {
            if let Some(request) = gateway.requests().first() {
                break request.order_code.clone();
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        };

        let err = h
            .reconciler
            .apply_notification(&PaymentNotification::parse(code.clone(), "settlement", None))
            .await
            .unwrap_err();
        assert!(matches!(err, NotificationError::CheckoutInProgress(c) if c == code));

        task.await.unwrap().unwrap();
        assert_eq!(
            h.notify(&code, "settlement", None).await,
            AppliedOutcome::Applied {
                new_status: BookingStatus::Paid
            }
        );
    }
}
