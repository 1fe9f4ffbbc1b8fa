//! SeaORM implementation of RepositoryProvider

use sea_orm::DatabaseConnection;

use crate::domain::{BookingRepository, CourtRepository, RepositoryProvider, SlotRepository};

use super::booking_repository::SeaOrmBookingRepository;
use super::court_repository::SeaOrmCourtRepository;
use super::slot_repository::SeaOrmSlotRepository;

/// Unified repository provider backed by SeaORM.
///
/// Holds one connection pool and exposes per-aggregate repository accessors.
///
/// ```ignore
/// let repos = SeaOrmRepositoryProvider::new(db.clone());
/// let slots = repos.slots().list_for_court(1, Some(date)).await?;
/// let booking = repos.bookings().find_by_code("RESV20240601070000-K3Q9ZD").await?;
/// ```
pub struct SeaOrmRepositoryProvider {
    courts: SeaOrmCourtRepository,
    slots: SeaOrmSlotRepository,
    bookings: SeaOrmBookingRepository,
}

impl SeaOrmRepositoryProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            courts: SeaOrmCourtRepository::new(db.clone()),
            slots: SeaOrmSlotRepository::new(db.clone()),
            bookings: SeaOrmBookingRepository::new(db),
        }
    }
}

impl RepositoryProvider for SeaOrmRepositoryProvider {
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
