//! Booking domain entity

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::slot::{HoldId, Slot, SlotKey};

/// Booking status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    /// Waiting for the payment provider
    Pending,
    /// Funds captured (terminal)
    Paid,
    /// Denied, cancelled or expired at the provider (terminal)
    Failed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "paid" => Some(Self::Paid),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid | Self::Failed)
    }

    /// pending → paid and pending → failed are the only legal moves.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        *self == Self::Pending && next.is_terminal()
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order code shared with the payment provider.
///
/// `RESV` + UTC timestamp to the second + `-` + six random upper-case
/// alphanumerics, e.g. `RESV20240601070000-K3Q9ZD`. The suffix keeps codes
/// unique for checkouts landing in the same second; the unique index on
/// `bookings.code` is the final guard.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BookingCode(String);

impl BookingCode {
    pub const SUFFIX_LEN: usize = 6;

    pub fn generate(now: DateTime<Utc>) -> Self {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(Self::SUFFIX_LEN)
            .map(|b| char::from(b).to_ascii_uppercase())
            .collect();
        Self(format!("RESV{}-{}", now.format("%Y%m%d%H%M%S"), suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for BookingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Frozen copy of one slot at booking time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingItem {
    pub court_id: i32,
    pub date: NaiveDate,
    pub start_min: i32,
    pub end_min: i32,
    pub price: i64,
}

impl BookingItem {
    pub fn from_slot(slot: &Slot) -> Self {
        Self {
            court_id: slot.court_id,
            date: slot.date,
            start_min: slot.start_min,
            end_min: slot.end_min,
            price: slot.price,
        }
    }

    pub fn key(&self) -> SlotKey {
        SlotKey::new(self.court_id, self.date, self.start_min, self.end_min)
    }
}

/// Booking aggregate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Booking {
    /// Storage id, `0` until persisted
    pub id: i32,
    pub code: String,
    /// Sum of item prices, fixed at creation
    pub total: i64,
    pub status: BookingStatus,
    /// Hold under which the slots were claimed
    pub hold_id: HoldId,
    pub items: Vec<BookingItem>,
    pub payment_token: Option<String>,
    pub redirect_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Build a pending booking; the total is computed here and nowhere else.
    pub fn new_pending(code: BookingCode, hold_id: HoldId, items: Vec<BookingItem>) -> Self {
        let now = Utc::now();
        let total = items.iter().map(|i| i.price).sum();
        Self {
            id: 0,
            code: code.into_string(),
            total,
            status: BookingStatus::Pending,
            hold_id,
            items,
            payment_token: None,
            redirect_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn slot_keys(&self) -> Vec<SlotKey> {
        self.items.iter().map(BookingItem::key).collect()
    }

    pub fn total_matches_items(&self) -> bool {
        self.total == self.items.iter().map(|i| i.price).sum::<i64>()
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::slot::SlotStatus;
    use chrono::TimeZone;
    use std::collections::HashSet;

    fn item(start_hour: i32, price: i64) -> BookingItem {
        BookingItem {
            court_id: 1,
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            start_min: start_hour * 60,
            end_min: (start_hour + 1) * 60,
            price,
        }
    }

    #[test]
    fn code_has_timestamp_prefix_and_random_suffix() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 7, 0, 0).unwrap();
        let code = BookingCode::generate(now);
        let (prefix, suffix) = code.as_str().split_once('-').unwrap();

        assert_eq!(prefix, "RESV20240601070000");
        assert_eq!(suffix.len(), BookingCode::SUFFIX_LEN);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        assert!(code.as_str().len() <= 50);
    }

    #[test]
    fn codes_generated_in_the_same_second_differ() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 7, 0, 0).unwrap();
        let codes: HashSet<_> = (0..200).map(|_| BookingCode::generate(now)).collect();
        assert_eq!(codes.len(), 200);
    }

    #[test]
    fn new_booking_is_pending_with_summed_total() {
        let booking = Booking::new_pending(
            BookingCode::generate(Utc::now()),
            HoldId::new(),
            vec![item(7, 90_000), item(8, 90_000), item(9, 110_000)],
        );
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.total, 290_000);
        assert!(booking.total_matches_items());
        assert_eq!(booking.slot_keys().len(), 3);
    }

    #[test]
    fn only_pending_may_transition() {
        use BookingStatus::*;
        assert!(Pending.can_transition_to(Paid));
        assert!(Pending.can_transition_to(Failed));
        assert!(!Pending.can_transition_to(Pending));
        assert!(!Paid.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Paid));
        assert!(!Paid.can_transition_to(Pending));
    }

    #[test]
    fn item_from_slot_copies_the_ledger_price() {
        let slot = Slot {
            id: 4,
            court_id: 2,
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            start_min: 19 * 60,
            end_min: 20 * 60,
            price: 120_000,
            status: SlotStatus::Held,
            hold_id: Some(HoldId::new()),
            hold_expires_at: None,
        };
        let item = BookingItem::from_slot(&slot);
        assert_eq!(item.key(), slot.key());
        assert_eq!(item.price, 120_000);
    }

    #[test]
    fn status_parse_rejects_unknown_values() {
        assert_eq!(BookingStatus::parse("paid"), Some(BookingStatus::Paid));
        assert_eq!(BookingStatus::parse("PAID"), None);
        assert_eq!(BookingStatus::parse(""), None);
    }
}
