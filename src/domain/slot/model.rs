//! Slot domain entity

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::errors::DomainError;

/// Minutes in a day; slot boundaries must fall inside `0..=MINUTES_PER_DAY`.
pub const MINUTES_PER_DAY: i32 = 24 * 60;

/// Identity of a bookable cell: one court, one date, one time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotKey {
    pub court_id: i32,
    pub date: NaiveDate,
    /// Minutes since 00:00
    pub start_min: i32,
    pub end_min: i32,
}

impl SlotKey {
    pub fn new(court_id: i32, date: NaiveDate, start_min: i32, end_min: i32) -> Self {
        Self {
            court_id,
            date,
            start_min,
            end_min,
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.start_min < 0 || self.end_min > MINUTES_PER_DAY {
            return Err(DomainError::Validation(format!(
                "{}: time range must lie within 00:00-24:00",
                self
            )));
        }
        if self.start_min >= self.end_min {
            return Err(DomainError::Validation(format!(
                "{}: start must be before end",
                self
            )));
        }
        Ok(())
    }

    /// Same court, same date, intersecting half-open time ranges.
    pub fn overlaps(&self, other: &SlotKey) -> bool {
        self.court_id == other.court_id
            && self.date == other.date
            && self.start_min < other.end_min
            && other.start_min < self.end_min
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "court {} on {} {}-{}",
            self.court_id,
            self.date,
            format_minute(self.start_min),
            format_minute(self.end_min)
        )
    }
}

/// `420` → `"07:00"`
pub fn format_minute(minute: i32) -> String {
    format!("{:02}:{:02}", minute / 60, minute % 60)
}

/// Slot status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    /// Open for checkout
    Free,
    /// Claimed by an in-flight checkout; expires if never committed
    Held,
    /// Claimed by a persisted booking
    Booked,
}

impl SlotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Held => "held",
            Self::Booked => "booked",
        }
    }

    /// Unrecognised values are treated as booked so they are never handed out.
    pub fn from_str(s: &str) -> Self {
        match s {
            "free" => Self::Free,
            "held" => Self::Held,
            _ => Self::Booked,
        }
    }
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle id shared by every slot claimed in one `try_hold` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HoldId(pub Uuid);

impl HoldId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for HoldId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HoldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for HoldId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A bookable slot as recorded by the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub id: i32,
    pub court_id: i32,
    pub date: NaiveDate,
    pub start_min: i32,
    pub end_min: i32,
    /// Price in minor currency units
    pub price: i64,
    pub status: SlotStatus,
    /// Hold that claimed this slot (held or booked)
    pub hold_id: Option<HoldId>,
    /// Deadline after which a held slot is swept back to free
    pub hold_expires_at: Option<DateTime<Utc>>,
}

impl Slot {
    pub fn key(&self) -> SlotKey {
        SlotKey::new(self.court_id, self.date, self.start_min, self.end_min)
    }

    pub fn is_free(&self) -> bool {
        self.status == SlotStatus::Free
    }

    /// Held by `hold_id` and not yet past its deadline.
    pub fn is_held_by(&self, hold_id: HoldId, now: DateTime<Utc>) -> bool {
        self.status == SlotStatus::Held
            && self.hold_id == Some(hold_id)
            && self.hold_expires_at.map_or(false, |deadline| deadline > now)
    }

    pub fn hold_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == SlotStatus::Held && self.hold_expires_at.map_or(true, |d| d <= now)
    }
}

/// Slot to be created by catalog generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSlot {
    pub key: SlotKey,
    pub price: i64,
}

/// Result of a storage-level hold attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoldAttempt {
    /// Every key moved free → held; snapshot of the held slots in key order
    Held(Vec<Slot>),
    /// First key (in key order) that was not free; nothing changed
    Unavailable(SlotKey),
    /// First key naming no slot at all; nothing changed
    Unknown(SlotKey),
}

/// Handle returned by a successful hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeldSet {
    pub id: HoldId,
    /// Sorted, de-duplicated
    pub keys: Vec<SlotKey>,
    pub expires_at: DateTime<Utc>,
    /// Ledger state of the held slots at hold time
    pub slots: Vec<Slot>,
}

impl HeldSet {
    /// Snapshot of `key` as read when the hold was taken
    pub fn slot(&self, key: &SlotKey) -> Option<&Slot> {
        self.slots.iter().find(|s| s.key() == *key)
    }

    /// Authoritative price for `key` as read when the hold was taken.
    pub fn price_of(&self, key: &SlotKey) -> Option<i64> {
        self.slot(key).map(|s| s.price)
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn slot(status: SlotStatus) -> Slot {
        Slot {
            id: 1,
            court_id: 1,
            date: date(),
            start_min: 7 * 60,
            end_min: 8 * 60,
            price: 90_000,
            status,
            hold_id: None,
            hold_expires_at: None,
        }
    }

    #[test]
    fn key_validation_rejects_inverted_and_out_of_day_ranges() {
        assert!(SlotKey::new(1, date(), 420, 480).validate().is_ok());
        assert!(SlotKey::new(1, date(), 480, 480).validate().is_err());
        assert!(SlotKey::new(1, date(), 540, 480).validate().is_err());
        assert!(SlotKey::new(1, date(), -60, 0).validate().is_err());
        assert!(SlotKey::new(1, date(), 1380, 1500).validate().is_err());
        assert!(SlotKey::new(1, date(), 1380, MINUTES_PER_DAY).validate().is_ok());
    }

    #[test]
    fn overlap_is_per_court_and_date() {
        let a = SlotKey::new(1, date(), 420, 480);
        assert!(a.overlaps(&SlotKey::new(1, date(), 450, 510)));
        // touching ranges do not overlap
        assert!(!a.overlaps(&SlotKey::new(1, date(), 480, 540)));
        assert!(!a.overlaps(&SlotKey::new(2, date(), 420, 480)));
        assert!(!a.overlaps(&SlotKey::new(1, date().succ_opt().unwrap(), 420, 480)));
    }

    #[test]
    fn display_uses_clock_times() {
        let key = SlotKey::new(3, date(), 420, 480);
        assert_eq!(key.to_string(), "court 3 on 2024-06-01 07:00-08:00");
    }

    #[test]
    fn unknown_status_is_never_free() {
        assert_eq!(SlotStatus::from_str("free"), SlotStatus::Free);
        assert_eq!(SlotStatus::from_str("held"), SlotStatus::Held);
        assert_eq!(SlotStatus::from_str("reserved"), SlotStatus::Booked);
    }

    #[test]
    fn held_by_requires_matching_hold_and_live_deadline() {
        let now = Utc::now();
        let hold = HoldId::new();
        let mut s = slot(SlotStatus::Held);
        s.hold_id = Some(hold);
        s.hold_expires_at = Some(now + Duration::minutes(15));

        assert!(s.is_held_by(hold, now));
        assert!(!s.is_held_by(HoldId::new(), now));
        assert!(!s.is_held_by(hold, now + Duration::minutes(16)));
        assert!(s.hold_expired(now + Duration::minutes(15)));
        assert!(!slot(SlotStatus::Booked).hold_expired(now));
    }

    #[test]
    fn held_set_reports_snapshot_price() {
        let s = slot(SlotStatus::Held);
        let held = HeldSet {
            id: HoldId::new(),
            keys: vec![s.key()],
            expires_at: Utc::now(),
            slots: vec![s.clone()],
        };
        assert_eq!(held.price_of(&s.key()), Some(90_000));
        assert_eq!(held.price_of(&SlotKey::new(9, date(), 0, 60)), None);
    }
}
