//! Catalog service: read paths and slot inventory generation

use std::sync::Arc;

use chrono::{Days, NaiveDate, Utc};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{info, warn};

use crate::domain::{
    Booking, Court, DomainError, DomainResult, NewCourt, NewSlot, RepositoryProvider, Slot,
    SlotKey,
};
use crate::shared::shutdown::ShutdownSignal;

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Days ahead (today included) that always have slots
    pub window_days: u32,
    pub open_hour: u32,
    /// Last slot ends at this hour
    pub close_hour: u32,
    pub default_price: i64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            window_days: 7,
            open_hour: 7,
            close_hour: 22,
            default_price: 90_000,
        }
    }
}

const DEMO_COURTS: [(&str, &str); 2] = [
    (
        "Lapangan Lor",
        "https://images.unsplash.com/photo-1517649763962-0c623066013b?q=80&w=1600&auto=format&fit=crop",
    ),
    (
        "Lapangan Kidul",
        "https://images.unsplash.com/photo-1574629810360-7efbbe195018?q=80&w=1600&auto=format&fit=crop",
    ),
];

pub struct CatalogService {
    repos: Arc<dyn RepositoryProvider>,
    config: CatalogConfig,
}

impl CatalogService {
    pub fn new(repos: Arc<dyn RepositoryProvider>, config: CatalogConfig) -> Self {
        Self { repos, config }
    }

    pub async fn list_courts(&self) -> DomainResult<Vec<Court>> {
        self.repos.courts().find_all().await
    }

    /// Slots of one court, ordered by date and start minute.
    pub async fn list_slots(&self, court_id: i32, date: Option<NaiveDate>) -> DomainResult<Vec<Slot>> {
        if self.repos.courts().find_by_id(court_id).await?.is_none() {
            return Err(DomainError::NotFound {
                entity: "Court",
                field: "id",
                value: court_id.to_string(),
            });
        }
        self.repos.slots().list_for_court(court_id, date).await
    }

    pub async fn list_bookings(&self, limit: u64) -> DomainResult<Vec<Booking>> {
        self.repos.bookings().list_recent(limit).await
    }

    pub async fn get_booking(&self, code: &str) -> DomainResult<Booking> {
        self.repos
            .bookings()
            .find_by_code(code)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity: "Booking",
                field: "code",
                value: code.to_string(),
            })
    }

    /// Create the demo courts when the catalog is empty. Returns whether it did.
    pub async fn seed_if_empty(&self) -> DomainResult<bool> {
        if self.repos.courts().count().await? > 0 {
            return Ok(false);
        }

        for (name, image) in DEMO_COURTS {
            self.repos
                .courts()
                .create(NewCourt {
                    name: name.to_string(),
                    sport: "Badminton".to_string(),
                    indoor: true,
                    surface: "Vinyl".to_string(),
                    image_urls: vec![image.to_string()],
                })
                .await?;
        }
        info!(courts = DEMO_COURTS.len(), "🌱 Demo courts seeded");
        Ok(true)
    }

    /// Make sure every court has hourly slots for the next `window_days`
    /// days starting at `today`. Returns how many slots were created.
    pub async fn extend_slot_window(&self, today: NaiveDate) -> DomainResult<u64> {
        let courts = self.repos.courts().find_all().await?;
        let mut created = 0;

        for court in &courts {
            for offset in 0..self.config.window_days {
                let Some(date) = today.checked_add_days(Days::new(u64::from(offset))) else {
                    break;
                };
                let existing = self.repos.slots().list_for_court(court.id, Some(date)).await?;
                let wanted = self.missing_slots(court.id, date, &existing);
                if !wanted.is_empty() {
                    created += self.repos.slots().insert_missing(&wanted).await?;
                }
            }
        }

        if created > 0 {
            info!(created, courts = courts.len(), days = self.config.window_days, "Slot window extended");
        }
        Ok(created)
    }

    fn missing_slots(&self, court_id: i32, date: NaiveDate, existing: &[Slot]) -> Vec<NewSlot> {
        let mut wanted = Vec::new();
        for hour in self.config.open_hour..self.config.close_hour {
            let start = hour as i32 * 60;
            let key = SlotKey::new(court_id, date, start, start + 60);
            if key.validate().is_err() {
                warn!(slot = %key, "Configured opening hours fall outside the day; slot skipped");
                continue;
            }
            if existing.iter().any(|s| s.key() == key) {
                continue;
            }
            if let Some(clash) = existing.iter().find(|s| s.key().overlaps(&key)) {
                warn!(slot = %key, existing = %clash.key(), "New slot overlaps an existing one; skipped");
                continue;
            }
            wanted.push(NewSlot {
                key,
                price: self.config.default_price,
            });
        }
        wanted
    }
}

/// Start the slot window refresh task. The first tick runs immediately.
pub fn start_slot_window_task(
    catalog: Arc<CatalogService>,
    shutdown: ShutdownSignal,
    interval_secs: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval = interval_secs, "📆 Slot window task started");

        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        let stop = shutdown.notified().wait();
        tokio::pin!(stop);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = catalog.extend_slot_window(Utc::now().date_naive()).await {
                        warn!(error = %e, "Slot window refresh error");
                    }
                }
                _ = &mut stop => {
                    info!("📆 Slot window task shutting down");
                    break;
                }
            }
        }
    })
}
