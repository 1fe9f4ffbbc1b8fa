//! Reservation coordinator
//!
//! hold → verify prices → build pending booking → payment intent → commit →
//! persist. Every failure after the hold undoes exactly what was done.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use dashmap::DashSet;
use thiserror::Error;
use tracing::{error, info, warn};

use super::ledger::{LedgerError, SlotLedger};
use crate::domain::{
    Booking, BookingCode, BookingItem, CustomerDetails, DomainError, DomainResult, GatewayError,
    HeldSet, LineItem, PaymentGateway, PaymentIntent, PaymentIntentRequest, RepositoryProvider,
    SlotKey,
};

/// Attempts at finding an unused booking code before giving up
const CODE_ATTEMPTS: usize = 3;

/// Line item id sent to the provider; one item covers the whole booking.
const LINE_ITEM_ID: &str = "booking";

/// One requested slot with the price the client saw
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutItem {
    pub court_id: i32,
    pub date: NaiveDate,
    pub start_min: i32,
    pub end_min: i32,
    pub price: i64,
}

impl CheckoutItem {
    pub fn key(&self) -> SlotKey {
        SlotKey::new(self.court_id, self.date, self.start_min, self.end_min)
    }
}

#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    pub customer: CustomerDetails,
    pub item_name: String,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            customer: CustomerDetails {
                name: "Pelanggan".to_string(),
                email: "pelanggan@example.com".to_string(),
            },
            item_name: "Reservasi Lapangan".to_string(),
        }
    }
}

/// Pending booking plus where the customer pays for it
#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
    pub booking: Booking,
    pub redirect_url: String,
    pub token: String,
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("checkout must include at least one slot")]
    Empty,

    #[error("slot requested more than once: {0}")]
    DuplicateSlot(SlotKey),

    #[error("invalid slot: {0}")]
    InvalidSlot(String),

    #[error("slot not available: {key}")]
    SlotUnavailable { key: SlotKey },

    #[error("no such slot: {key}")]
    UnknownSlot { key: SlotKey },

    #[error("price for {key} is {expected}, request said {submitted}")]
    PriceMismatch {
        key: SlotKey,
        expected: i64,
        submitted: i64,
    },

    #[error("hold expired before the booking could be confirmed")]
    HoldExpired,

    #[error("payment gateway unavailable: {0}")]
    PaymentGatewayUnavailable(#[source] GatewayError),

    #[error("operation timed out")]
    Timeout,

    #[error(transparent)]
    Storage(DomainError),
}

impl CheckoutError {
    /// Label for the `checkouts_total` counter
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Empty | Self::DuplicateSlot(_) | Self::InvalidSlot(_) => "invalid",
            Self::SlotUnavailable { .. } => "conflict",
            Self::UnknownSlot { .. } => "unknown_slot",
            Self::PriceMismatch { .. } => "price_mismatch",
            Self::HoldExpired => "hold_expired",
            Self::PaymentGatewayUnavailable(_) => "gateway_unavailable",
            Self::Timeout => "timeout",
            Self::Storage(_) => "storage_error",
        }
    }
}

impl From<LedgerError> for CheckoutError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Conflict { first_unavailable } => Self::SlotUnavailable {
                key: first_unavailable,
            },
            LedgerError::UnknownSlot(key) => Self::UnknownSlot { key },
            LedgerError::InvalidSelection(msg) => Self::InvalidSlot(msg),
            LedgerError::InvalidHandle(_) => Self::HoldExpired,
            LedgerError::Timeout(_) => Self::Timeout,
            LedgerError::Storage(e) => Self::Storage(e),
        }
    }
}

/// Order codes handed out to a checkout whose booking row is not written yet.
///
/// The provider may call back before the row exists; the settlement side
/// asks this registry to tell such a code apart from a truly unknown one.
#[derive(Clone, Default)]
pub struct InFlightCheckouts {
    codes: Arc<DashSet<String>>,
}

impl InFlightCheckouts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.codes.contains(code)
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// `None` when the code is already claimed by another checkout.
    fn claim(&self, code: &BookingCode) -> Option<InFlightGuard> {
        let code = code.as_str().to_string();
        if !self.codes.insert(code.clone()) {
            return None;
        }
        Some(InFlightGuard {
            codes: self.codes.clone(),
            code,
        })
    }
}

/// Removes its code from the registry when the checkout ends, however it ends.
struct InFlightGuard {
    codes: Arc<DashSet<String>>,
    code: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.codes.remove(&self.code);
    }
}

pub struct ReservationCoordinator {
    repos: Arc<dyn RepositoryProvider>,
    ledger: Arc<SlotLedger>,
    gateway: Arc<dyn PaymentGateway>,
    config: CheckoutConfig,
    in_flight: InFlightCheckouts,
}

impl ReservationCoordinator {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        ledger: Arc<SlotLedger>,
        gateway: Arc<dyn PaymentGateway>,
        config: CheckoutConfig,
    ) -> Self {
        Self {
            repos,
            ledger,
            gateway,
            config,
            in_flight: InFlightCheckouts::new(),
        }
    }

    /// Registry shared with the settlement reconciler
    pub fn in_flight(&self) -> InFlightCheckouts {
        self.in_flight.clone()
    }

    pub async fn checkout(&self, items: Vec<CheckoutItem>) -> Result<CheckoutReceipt, CheckoutError> {
        let result = self.run(items).await;
        let outcome = match &result {
            Ok(_) => "created",
            Err(e) => e.outcome(),
        };
        metrics::counter!("checkouts_total", "outcome" => outcome).increment(1);
        result
    }

    async fn run(&self, items: Vec<CheckoutItem>) -> Result<CheckoutReceipt, CheckoutError> {
        let keys = validate_items(&items)?;

        let held = self.ledger.try_hold(&keys).await.map_err(|e| {
            if let LedgerError::Conflict { first_unavailable } = &e {
                info!(slot = %first_unavailable, "Checkout lost slot race");
            }
            CheckoutError::from(e)
        })?;

        if let Err(e) = verify_prices(&items, &held) {
            self.compensate_hold(&held, "price_mismatch").await;
            return Err(e);
        }

        let (code, _claim) = match self.unused_code().await {
            Ok(claimed) => claimed,
            Err(e) => {
                self.compensate_hold(&held, e.outcome()).await;
                return Err(e);
            }
        };

        // Frozen from the ledger snapshot, in request order.
        let booking_items = items
            .iter()
            .filter_map(|i| held.slot(&i.key()))
            .map(BookingItem::from_slot)
            .collect();
        let mut booking = Booking::new_pending(code, held.id, booking_items);

        let intent = match self.request_intent(&booking).await {
            Ok(intent) => intent,
            Err(e) => {
                warn!(code = %booking.code, error = %e, "Payment intent failed, releasing hold");
                self.compensate_hold(&held, "gateway_unavailable").await;
                return Err(CheckoutError::PaymentGatewayUnavailable(e));
            }
        };

        if let Err(e) = self.ledger.commit(&held).await {
            warn!(code = %booking.code, hold = %held.id, error = %e, "Commit failed after payment intent");
            self.compensate_hold(&held, "commit_failed").await;
            return Err(match e {
                LedgerError::InvalidHandle(_) => CheckoutError::HoldExpired,
                other => other.into(),
            });
        }

        booking.payment_token = Some(intent.token.clone());
        booking.redirect_url = Some(intent.redirect_url.clone());

        let stored = match self.bounded(self.repos.bookings().insert(&booking)).await {
            Ok(stored) => stored,
            Err(e) => {
                error!(code = %booking.code, error = %e, "Failed to persist booking, releasing slots");
                if let Err(release_err) = self.ledger.release_booked(held.id, &held.keys).await {
                    error!(hold = %held.id, error = %release_err, "Failed to release booked slots");
                }
                return Err(e);
            }
        };

        info!(
            code = %stored.code,
            booking_id = stored.id,
            total = stored.total,
            slots = stored.items.len(),
            "✅ Booking created"
        );

        Ok(CheckoutReceipt {
            booking: stored,
            redirect_url: intent.redirect_url,
            token: intent.token,
        })
    }

    /// Booking store calls share the ledger's operation timeout.
    async fn bounded<T>(
        &self,
        fut: impl Future<Output = DomainResult<T>>,
    ) -> Result<T, CheckoutError> {
        let limit = self.ledger.config().operation_timeout;
        match tokio::time::timeout(limit, fut).await {
            Ok(result) => result.map_err(CheckoutError::Storage),
            Err(_) => {
                warn!(timeout = ?limit, "Booking store call timed out");
                Err(CheckoutError::Timeout)
            }
        }
    }

    /// Generate a code that is neither stored nor claimed by a concurrent
    /// checkout, and claim it.
    async fn unused_code(&self) -> Result<(BookingCode, InFlightGuard), CheckoutError> {
        for _ in 0..CODE_ATTEMPTS {
            let code = BookingCode::generate(Utc::now());
            let Some(claim) = self.in_flight.claim(&code) else {
                warn!(code = %code, "Booking code already in flight, regenerating");
                continue;
            };
            match self.bounded(self.repos.bookings().find_by_code(code.as_str())).await? {
                None => return Ok((code, claim)),
                Some(_) => warn!(code = %code, "Booking code collision, regenerating"),
            }
        }
        Err(CheckoutError::Storage(DomainError::Conflict(
            "could not generate an unused booking code".to_string(),
        )))
    }

    async fn request_intent(&self, booking: &Booking) -> Result<PaymentIntent, GatewayError> {
        let request = PaymentIntentRequest {
            order_code: booking.code.clone(),
            gross_amount: booking.total,
            customer: self.config.customer.clone(),
            line_item: LineItem {
                id: LINE_ITEM_ID.to_string(),
                price: booking.total,
                qty: 1,
                name: self.config.item_name.clone(),
            },
        };
        self.gateway.create_intent(&request).await
    }

    /// Release a hold after a failed checkout step. The sweep reclaims it
    /// later if this fails too.
    async fn compensate_hold(&self, held: &HeldSet, reason: &'static str) {
        if let Err(e) = self.ledger.release(held).await {
            error!(hold = %held.id, reason, error = %e, "Failed to release hold; left for expiry sweep");
        }
    }
}

fn validate_items(items: &[CheckoutItem]) -> Result<Vec<SlotKey>, CheckoutError> {
    if items.is_empty() {
        return Err(CheckoutError::Empty);
    }

    let mut seen = HashSet::with_capacity(items.len());
    let mut keys = Vec::with_capacity(items.len());
    for item in items {
        let key = item.key();
        key.validate()
            .map_err(|e| CheckoutError::InvalidSlot(e.to_string()))?;
        if item.price < 0 {
            return Err(CheckoutError::InvalidSlot(format!(
                "{}: price must not be negative",
                key
            )));
        }
        if !seen.insert(key) {
            return Err(CheckoutError::DuplicateSlot(key));
        }
        keys.push(key);
    }
    Ok(keys)
}

fn verify_prices(items: &[CheckoutItem], held: &HeldSet) -> Result<(), CheckoutError> {
    for item in items {
        let key = item.key();
        // held.slots covers every requested key after a successful hold
        let expected = held.price_of(&key).unwrap_or(i64::MIN);
        if expected != item.price {
            return Err(CheckoutError::PriceMismatch {
                key,
                expected,
                submitted: item.price,
            });
        }
    }
    Ok(())
}
