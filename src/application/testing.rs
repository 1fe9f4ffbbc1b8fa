//! Fixtures shared by the service tests

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::{
    Booking, BookingRepository, BookingStatus, CourtRepository, DomainResult, GatewayError,
    HoldAttempt, HoldId, NewCourt, NewSlot, PaymentGateway, PaymentIntent, PaymentIntentRequest,
    RepositoryProvider, Slot, SlotKey, SlotRepository,
};
use crate::infrastructure::InMemoryRepositoryProvider;

pub fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

/// One-hour slot on court 1
pub fn hour_key(hour: i32) -> SlotKey {
    SlotKey::new(1, day(), hour * 60, (hour + 1) * 60)
}

/// Court 1 with free 07:00-10:00 hourly slots at 90000 on [`day`].
pub async fn seeded_repos() -> Arc<dyn RepositoryProvider> {
    let repos: Arc<dyn RepositoryProvider> = Arc::new(InMemoryRepositoryProvider::new());
    repos
        .courts()
        .create(NewCourt {
            name: "Lapangan Lor".to_string(),
            sport: "Badminton".to_string(),
            indoor: true,
            surface: "Vinyl".to_string(),
            image_urls: vec!["/img/lor.jpg".to_string()],
        })
        .await
        .unwrap();
    let slots: Vec<NewSlot> = (7..10)
        .map(|h| NewSlot {
            key: hour_key(h),
            price: 90_000,
        })
        .collect();
    repos.slots().insert_missing(&slots).await.unwrap();
    repos
}

#[derive(Clone, Copy)]
pub enum FakeMode {
    Approve,
    Fail,
    /// Answer successfully after sleeping
    Slow(Duration),
}

/// Gateway double that records every request it receives.
pub struct FakeGateway {
    mode: FakeMode,
    calls: AtomicUsize,
    requests: Mutex<Vec<PaymentIntentRequest>>,
}

impl FakeGateway {
    pub fn new(mode: FakeMode) -> Self {
        Self {
            mode,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn approving() -> Arc<Self> {
        Arc::new(Self::new(FakeMode::Approve))
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self::new(FakeMode::Fail))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<PaymentIntentRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> Result<PaymentIntent, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        match self.mode {
            FakeMode::Approve => {}
            FakeMode::Fail => {
                return Err(GatewayError::Transport("connection refused".to_string()))
            }
            FakeMode::Slow(delay) => tokio::time::sleep(delay).await,
        }
        Ok(PaymentIntent {
            redirect_url: format!("https://pay.example/v2/vtweb/{}", request.order_code),
            token: format!("tok-{}", request.order_code),
        })
    }
}

/// Operations that sleep before reaching the wrapped store
struct Stalls {
    ops: Mutex<HashSet<&'static str>>,
    delay: Duration,
}

impl Stalls {
    async fn pause(&self, op: &'static str) {
        let stalled = self.ops.lock().unwrap().contains(op);
        if stalled {
            tokio::time::sleep(self.delay).await;
        }
    }
}

/// Provider wrapper whose selected operations hang for `delay` first.
///
/// Stallable: `hold`, `commit_hold`, `insert`, `find_by_code`.
pub struct StallingRepos {
    courts: Arc<dyn RepositoryProvider>,
    slots: StallingSlots,
    bookings: StallingBookings,
    stalls: Arc<Stalls>,
}

impl StallingRepos {
    pub fn wrap(inner: Arc<dyn RepositoryProvider>, delay: Duration) -> Arc<Self> {
        let stalls = Arc::new(Stalls {
            ops: Mutex::new(HashSet::new()),
            delay,
        });
        Arc::new(Self {
            courts: inner.clone(),
            slots: StallingSlots {
                inner: inner.clone(),
                stalls: stalls.clone(),
            },
            bookings: StallingBookings {
                inner,
                stalls: stalls.clone(),
            },
            stalls,
        })
    }

    pub fn stall(&self, op: &'static str) {
        self.stalls.ops.lock().unwrap().insert(op);
    }

    pub fn resume(&self, op: &'static str) {
        self.stalls.ops.lock().unwrap().remove(op);
    }
}

impl RepositoryProvider for StallingRepos {
    fn courts(&self) -> &dyn CourtRepository {
        self.courts.courts()
    }

    fn slots(&self) -> &dyn SlotRepository {
        &self.slots
    }

    fn bookings(&self) -> &dyn BookingRepository {
        &self.bookings
    }
}

struct StallingSlots {
    inner: Arc<dyn RepositoryProvider>,
    stalls: Arc<Stalls>,
}

#[async_trait]
impl SlotRepository for StallingSlots {
    async fn list_for_court(
        &self,
        court_id: i32,
        date: Option<NaiveDate>,
    ) -> DomainResult<Vec<Slot>> {
        self.inner.slots().list_for_court(court_id, date).await
    }

    async fn find(&self, key: &SlotKey) -> DomainResult<Option<Slot>> {
        self.inner.slots().find(key).await
    }

    async fn insert_missing(&self, slots: &[NewSlot]) -> DomainResult<u64> {
        self.inner.slots().insert_missing(slots).await
    }

    async fn hold(
        &self,
        keys: &[SlotKey],
        hold_id: HoldId,
        expires_at: DateTime<Utc>,
    ) -> DomainResult<HoldAttempt> {
        self.stalls.pause("hold").await;
        self.inner.slots().hold(keys, hold_id, expires_at).await
    }

    async fn commit_hold(
        &self,
        hold_id: HoldId,
        keys: &[SlotKey],
        now: DateTime<Utc>,
    ) -> DomainResult<bool> {
        self.stalls.pause("commit_hold").await;
        self.inner.slots().commit_hold(hold_id, keys, now).await
    }

    async fn release_hold(&self, hold_id: HoldId, keys: &[SlotKey]) -> DomainResult<u64> {
        self.inner.slots().release_hold(hold_id, keys).await
    }

    async fn release_booked(&self, hold_id: HoldId, keys: &[SlotKey]) -> DomainResult<u64> {
        self.inner.slots().release_booked(hold_id, keys).await
    }

    async fn release_expired_holds(&self, now: DateTime<Utc>) -> DomainResult<u64> {
        self.inner.slots().release_expired_holds(now).await
    }
}

struct StallingBookings {
    inner: Arc<dyn RepositoryProvider>,
    stalls: Arc<Stalls>,
}

#[async_trait]
impl BookingRepository for StallingBookings {
    async fn insert(&self, booking: &Booking) -> DomainResult<Booking> {
        self.stalls.pause("insert").await;
        self.inner.bookings().insert(booking).await
    }

    async fn find_by_code(&self, code: &str) -> DomainResult<Option<Booking>> {
        self.stalls.pause("find_by_code").await;
        self.inner.bookings().find_by_code(code).await
    }

    async fn list_recent(&self, limit: u64) -> DomainResult<Vec<Booking>> {
        self.inner.bookings().list_recent(limit).await
    }

    async fn compare_and_set_status(
        &self,
        code: &str,
        expected: BookingStatus,
        next: BookingStatus,
    ) -> DomainResult<bool> {
        self.inner
            .bookings()
            .compare_and_set_status(code, expected, next)
            .await
    }
}
