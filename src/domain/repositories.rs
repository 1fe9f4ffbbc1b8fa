//! Repository provider for the domain layer

use super::booking::BookingRepository;
use super::court::CourtRepository;
use super::slot::SlotRepository;

/// Provides access to all domain repositories.
///
/// Services hold an `Arc<dyn RepositoryProvider>` and ask for the repository
/// they need:
///
/// ```ignore
/// let slots = repos.slots().list_for_court(court_id, Some(date)).await?;
/// let booking = repos.bookings().find_by_code("RESV20240601070000-K3Q9ZD").await?;
/// ```
pub trait RepositoryProvider: Send + Sync {
    fn courts(&self) -> &dyn CourtRepository;
    fn slots(&self) -> &dyn SlotRepository;
    fn bookings(&self) -> &dyn BookingRepository;
}
