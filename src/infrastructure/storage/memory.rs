//! In-memory repositories for development and testing
//!
//! Slots live in one mutex-guarded ordered map so a multi-key hold is a single
//! critical section; bookings live in a `DashMap` keyed by code whose shard
//! locks make compare-and-set atomic.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::domain::{
    Booking, BookingRepository, BookingStatus, Court, CourtImage, CourtRepository, DomainError,
    DomainResult, HoldAttempt, HoldId, NewCourt, NewSlot, RepositoryProvider, Slot, SlotKey,
    SlotRepository, SlotStatus,
};

// ── Courts ─────────────────────────────────────────────────────

pub struct InMemoryCourtRepository {
    courts: DashMap<i32, Court>,
    court_counter: AtomicI32,
    image_counter: AtomicI32,
}

impl InMemoryCourtRepository {
    pub fn new() -> Self {
        Self {
            courts: DashMap::new(),
            court_counter: AtomicI32::new(1),
            image_counter: AtomicI32::new(1),
        }
    }
}

#[async_trait]
impl CourtRepository for InMemoryCourtRepository {
    async fn find_all(&self) -> DomainResult<Vec<Court>> {
        let mut courts: Vec<Court> = self.courts.iter().map(|e| e.value().clone()).collect();
        courts.sort_by_key(|c| c.id);
        Ok(courts)
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Court>> {
        Ok(self.courts.get(&id).map(|c| c.clone()))
    }

    async fn create(&self, court: NewCourt) -> DomainResult<Court> {
        let id = self.court_counter.fetch_add(1, Ordering::SeqCst);
        let images = court
            .image_urls
            .into_iter()
            .map(|url| CourtImage {
                id: self.image_counter.fetch_add(1, Ordering::SeqCst),
                url,
            })
            .collect();
        let created = Court {
            id,
            name: court.name,
            sport: court.sport,
            indoor: court.indoor,
            surface: court.surface,
            images,
            created_at: Utc::now(),
        };
        self.courts.insert(id, created.clone());
        Ok(created)
    }

    async fn count(&self) -> DomainResult<u64> {
        Ok(self.courts.len() as u64)
    }
}

// ── Slots ──────────────────────────────────────────────────────

pub struct InMemorySlotRepository {
    slots: Mutex<BTreeMap<SlotKey, Slot>>,
    slot_counter: AtomicI32,
}

impl InMemorySlotRepository {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(BTreeMap::new()),
            slot_counter: AtomicI32::new(1),
        }
    }

    fn ledger(&self) -> MutexGuard<'_, BTreeMap<SlotKey, Slot>> {
        // No invariant spans a panic: every mutation below is a plain
        // field assignment after all checks passed.
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn set_free(slot: &mut Slot) {
    slot.status = SlotStatus::Free;
    slot.hold_id = None;
    slot.hold_expires_at = None;
}

#[async_trait]
impl SlotRepository for InMemorySlotRepository {
    async fn list_for_court(
        &self,
        court_id: i32,
        date: Option<NaiveDate>,
    ) -> DomainResult<Vec<Slot>> {
        // BTreeMap order is (court, date, start, end)
        Ok(self
            .ledger()
            .values()
            .filter(|s| s.court_id == court_id && date.map_or(true, |d| s.date == d))
            .cloned()
            .collect())
    }

    async fn find(&self, key: &SlotKey) -> DomainResult<Option<Slot>> {
        Ok(self.ledger().get(key).cloned())
    }

    async fn insert_missing(&self, slots: &[NewSlot]) -> DomainResult<u64> {
        let mut ledger = self.ledger();
        let mut inserted = 0;
        for new in slots {
            if ledger.contains_key(&new.key) {
                continue;
            }
            let slot = Slot {
                id: self.slot_counter.fetch_add(1, Ordering::SeqCst),
                court_id: new.key.court_id,
                date: new.key.date,
                start_min: new.key.start_min,
                end_min: new.key.end_min,
                price: new.price,
                status: SlotStatus::Free,
                hold_id: None,
                hold_expires_at: None,
            };
            ledger.insert(new.key, slot);
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn hold(
        &self,
        keys: &[SlotKey],
        hold_id: HoldId,
        expires_at: DateTime<Utc>,
    ) -> DomainResult<HoldAttempt> {
        let mut ledger = self.ledger();

        for key in keys {
            match ledger.get(key) {
                None => return Ok(HoldAttempt::Unknown(*key)),
                Some(slot) if !slot.is_free() => return Ok(HoldAttempt::Unavailable(*key)),
                Some(_) => {}
            }
        }

        let mut held = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(slot) = ledger.get_mut(key) {
                slot.status = SlotStatus::Held;
                slot.hold_id = Some(hold_id);
                slot.hold_expires_at = Some(expires_at);
                held.push(slot.clone());
            }
        }
        Ok(HoldAttempt::Held(held))
    }

    async fn commit_hold(
        &self,
        hold_id: HoldId,
        keys: &[SlotKey],
        now: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let mut ledger = self.ledger();

        let all_held = keys
            .iter()
            .all(|k| ledger.get(k).map_or(false, |s| s.is_held_by(hold_id, now)));
        if !all_held {
            return Ok(false);
        }

        for key in keys {
            if let Some(slot) = ledger.get_mut(key) {
                slot.status = SlotStatus::Booked;
                slot.hold_expires_at = None;
            }
        }
        Ok(true)
    }

    async fn release_hold(&self, hold_id: HoldId, keys: &[SlotKey]) -> DomainResult<u64> {
        let mut ledger = self.ledger();
        let mut released = 0;
        for key in keys {
            if let Some(slot) = ledger.get_mut(key) {
                if slot.status == SlotStatus::Held && slot.hold_id == Some(hold_id) {
                    set_free(slot);
                    released += 1;
                }
            }
        }
        Ok(released)
    }

    async fn release_booked(&self, hold_id: HoldId, keys: &[SlotKey]) -> DomainResult<u64> {
        let mut ledger = self.ledger();
        let mut released = 0;
        for key in keys {
            if let Some(slot) = ledger.get_mut(key) {
                if slot.status == SlotStatus::Booked && slot.hold_id == Some(hold_id) {
                    set_free(slot);
                    released += 1;
                }
            }
        }
        Ok(released)
    }

    async fn release_expired_holds(&self, now: DateTime<Utc>) -> DomainResult<u64> {
        let mut ledger = self.ledger();
        let mut released = 0;
        for slot in ledger.values_mut() {
            if slot.hold_expired(now) {
                set_free(slot);
                released += 1;
            }
        }
        Ok(released)
    }
}

// ── Bookings ───────────────────────────────────────────────────

pub struct InMemoryBookingRepository {
    bookings: DashMap<String, Booking>,
    booking_counter: AtomicI32,
}

impl InMemoryBookingRepository {
    pub fn new() -> Self {
        Self {
            bookings: DashMap::new(),
            booking_counter: AtomicI32::new(1),
        }
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn insert(&self, booking: &Booking) -> DomainResult<Booking> {
        match self.bookings.entry(booking.code.clone()) {
            Entry::Occupied(_) => Err(DomainError::Conflict(format!(
                "booking code {}",
                booking.code
            ))),
            Entry::Vacant(slot) => {
                let mut stored = booking.clone();
                stored.id = self.booking_counter.fetch_add(1, Ordering::SeqCst);
                slot.insert(stored.clone());
                Ok(stored)
            }
        }
    }

    async fn find_by_code(&self, code: &str) -> DomainResult<Option<Booking>> {
        Ok(self.bookings.get(code).map(|b| b.clone()))
    }

    async fn list_recent(&self, limit: u64) -> DomainResult<Vec<Booking>> {
        let mut all: Vec<Booking> = self.bookings.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| b.id.cmp(&a.id));
        all.truncate(limit as usize);
        Ok(all)
    }

    async fn compare_and_set_status(
        &self,
        code: &str,
        expected: BookingStatus,
        next: BookingStatus,
    ) -> DomainResult<bool> {
        let Some(mut booking) = self.bookings.get_mut(code) else {
            return Err(DomainError::NotFound {
                entity: "Booking",
                field: "code",
                value: code.to_string(),
            });
        };
        if booking.status != expected {
            return Ok(false);
        }
        booking.status = next;
        booking.updated_at = Utc::now();
        Ok(true)
    }
}

// ── Provider ───────────────────────────────────────────────────

/// In-memory [`RepositoryProvider`]; state is lost on restart.
pub struct InMemoryRepositoryProvider {
    courts: InMemoryCourtRepository,
    slots: InMemorySlotRepository,
    bookings: InMemoryBookingRepository,
}

impl InMemoryRepositoryProvider {
    pub fn new() -> Self {
        Self {
            courts: InMemoryCourtRepository::new(),
            slots: InMemorySlotRepository::new(),
            bookings: InMemoryBookingRepository::new(),
        }
    }
}

impl Default for InMemoryRepositoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl RepositoryProvider for InMemoryRepositoryProvider {
    fn courts(&self) -> &dyn CourtRepository {
        &self.courts
    }

    fn slots(&self) -> &dyn SlotRepository {
        &self.slots
    }

    fn bookings(&self) -> &dyn BookingRepository {
        &self.bookings
    }
}
