//! SeaORM implementation of SlotRepository
//!
//! State changes are conditional `UPDATE`s whose `WHERE` clause carries the
//! expected status. Multi-key moves run in one transaction that is rolled
//! back as soon as any row fails its condition.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use log::debug;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveValue::NotSet, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};

use super::db_err;
use crate::domain::{
    DomainResult, HoldAttempt, HoldId, NewSlot, Slot, SlotKey, SlotRepository, SlotStatus,
};
use crate::infrastructure::database::entities::slot;

/// Rows per multi-row insert; keeps bound parameters well under SQLite's limit.
const INSERT_CHUNK: usize = 50;

pub struct SeaOrmSlotRepository {
    db: DatabaseConnection,
}

impl SeaOrmSlotRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: slot::Model) -> Slot {
    Slot {
        id: m.id,
        court_id: m.court_id,
        date: m.date,
        start_min: m.start_min,
        end_min: m.end_min,
        price: m.price,
        status: SlotStatus::from_str(&m.status),
        hold_id: m.hold_id.as_deref().and_then(|s| s.parse().ok()),
        hold_expires_at: m.hold_expires_at,
    }
}

fn key_condition(key: &SlotKey) -> Condition {
    Condition::all()
        .add(slot::Column::CourtId.eq(key.court_id))
        .add(slot::Column::Date.eq(key.date))
        .add(slot::Column::StartMin.eq(key.start_min))
        .add(slot::Column::EndMin.eq(key.end_min))
}

fn any_key(keys: &[SlotKey]) -> Condition {
    keys.iter()
        .fold(Condition::any(), |cond, key| cond.add(key_condition(key)))
}

async fn find_one<C: ConnectionTrait>(conn: &C, key: &SlotKey) -> Result<Option<slot::Model>, DbErr> {
    slot::Entity::find().filter(key_condition(key)).one(conn).await
}

/// Set claimed slots back to free. Returns rows changed.
async fn free_where(db: &DatabaseConnection, condition: Condition) -> DomainResult<u64> {
    let result = slot::Entity::update_many()
        .col_expr(slot::Column::Status, Expr::value(SlotStatus::Free.as_str()))
        .col_expr(slot::Column::HoldId, Expr::value(Option::<String>::None))
        .col_expr(
            slot::Column::HoldExpiresAt,
            Expr::value(Option::<DateTime<Utc>>::None),
        )
        .col_expr(slot::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(condition)
        .exec(db)
        .await
        .map_err(db_err)?;
    Ok(result.rows_affected)
}

// ── SlotRepository impl ─────────────────────────────────────────

#[async_trait]
impl SlotRepository for SeaOrmSlotRepository {
    async fn list_for_court(
        &self,
        court_id: i32,
        date: Option<NaiveDate>,
    ) -> DomainResult<Vec<Slot>> {
        let mut query = slot::Entity::find().filter(slot::Column::CourtId.eq(court_id));
        if let Some(date) = date {
            query = query.filter(slot::Column::Date.eq(date));
        }
        let models = query
            .order_by_asc(slot::Column::Date)
            .order_by_asc(slot::Column::StartMin)
            .order_by_asc(slot::Column::EndMin)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn find(&self, key: &SlotKey) -> DomainResult<Option<Slot>> {
        Ok(find_one(&self.db, key)
            .await
            .map_err(db_err)?
            .map(model_to_domain))
    }

    async fn insert_missing(&self, slots: &[NewSlot]) -> DomainResult<u64> {
        let now = Utc::now();
        let mut inserted = 0;

        for chunk in slots.chunks(INSERT_CHUNK) {
            let models = chunk.iter().map(|new| slot::ActiveModel {
                id: NotSet,
                court_id: Set(new.key.court_id),
                date: Set(new.key.date),
                start_min: Set(new.key.start_min),
                end_min: Set(new.key.end_min),
                price: Set(new.price),
                status: Set(SlotStatus::Free.as_str().to_string()),
                hold_id: Set(None),
                hold_expires_at: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
            });

            let result = slot::Entity::insert_many(models)
                .on_conflict(
                    OnConflict::columns([
                        slot::Column::CourtId,
                        slot::Column::Date,
                        slot::Column::StartMin,
                        slot::Column::EndMin,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec_without_returning(&self.db)
                .await;

            match result {
                Ok(rows) => inserted += rows,
                Err(DbErr::RecordNotInserted) => {}
                Err(e) => return Err(db_err(e)),
            }
        }

        debug!("Inserted {} of {} candidate slots", inserted, slots.len());
        Ok(inserted)
    }

    async fn hold(
        &self,
        keys: &[SlotKey],
        hold_id: HoldId,
        expires_at: DateTime<Utc>,
    ) -> DomainResult<HoldAttempt> {
        let now = Utc::now();
        let txn = self.db.begin().await.map_err(db_err)?;

        for key in keys {
            let result = slot::Entity::update_many()
                .col_expr(slot::Column::Status, Expr::value(SlotStatus::Held.as_str()))
                .col_expr(slot::Column::HoldId, Expr::value(hold_id.to_string()))
                .col_expr(slot::Column::HoldExpiresAt, Expr::value(expires_at))
                .col_expr(slot::Column::UpdatedAt, Expr::value(now))
                .filter(key_condition(key))
                .filter(slot::Column::Status.eq(SlotStatus::Free.as_str()))
                .exec(&txn)
                .await
                .map_err(db_err)?;

            if result.rows_affected != 1 {
                let exists = find_one(&txn, key).await.map_err(db_err)?.is_some();
                txn.rollback().await.map_err(db_err)?;
                return Ok(if exists {
                    HoldAttempt::Unavailable(*key)
                } else {
                    HoldAttempt::Unknown(*key)
                });
            }
        }

        let mut held = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(model) = find_one(&txn, key).await.map_err(db_err)? {
                held.push(model_to_domain(model));
            }
        }

        txn.commit().await.map_err(db_err)?;
        Ok(HoldAttempt::Held(held))
    }

    async fn commit_hold(
        &self,
        hold_id: HoldId,
        keys: &[SlotKey],
        now: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let txn = self.db.begin().await.map_err(db_err)?;

        for key in keys {
            let result = slot::Entity::update_many()
                .col_expr(slot::Column::Status, Expr::value(SlotStatus::Booked.as_str()))
                .col_expr(
                    slot::Column::HoldExpiresAt,
                    Expr::value(Option::<DateTime<Utc>>::None),
                )
                .col_expr(slot::Column::UpdatedAt, Expr::value(now))
                .filter(key_condition(key))
                .filter(slot::Column::Status.eq(SlotStatus::Held.as_str()))
                .filter(slot::Column::HoldId.eq(hold_id.to_string()))
                .filter(slot::Column::HoldExpiresAt.gt(now))
                .exec(&txn)
                .await
                .map_err(db_err)?;

            if result.rows_affected != 1 {
                txn.rollback().await.map_err(db_err)?;
                return Ok(false);
            }
        }

        txn.commit().await.map_err(db_err)?;
        Ok(true)
    }

    async fn release_hold(&self, hold_id: HoldId, keys: &[SlotKey]) -> DomainResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        free_where(
            &self.db,
            Condition::all()
                .add(slot::Column::Status.eq(SlotStatus::Held.as_str()))
                .add(slot::Column::HoldId.eq(hold_id.to_string()))
                .add(any_key(keys)),
        )
        .await
    }

    async fn release_booked(&self, hold_id: HoldId, keys: &[SlotKey]) -> DomainResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        free_where(
            &self.db,
            Condition::all()
                .add(slot::Column::Status.eq(SlotStatus::Booked.as_str()))
                .add(slot::Column::HoldId.eq(hold_id.to_string()))
                .add(any_key(keys)),
        )
        .await
    }

    async fn release_expired_holds(&self, now: DateTime<Utc>) -> DomainResult<u64> {
        free_where(
            &self.db,
            Condition::all()
                .add(slot::Column::Status.eq(SlotStatus::Held.as_str()))
                .add(
                    Condition::any()
                        .add(slot::Column::HoldExpiresAt.lte(now))
                        .add(slot::Column::HoldExpiresAt.is_null()),
                ),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CourtRepository, NewCourt};
    use crate::infrastructure::database::repositories::court_repository::SeaOrmCourtRepository;
    use crate::infrastructure::database::repositories::test_db;
    use chrono::Duration;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn key(court_id: i32, hour: i32) -> SlotKey {
        SlotKey::new(court_id, day(), hour * 60, (hour + 1) * 60)
    }

    async fn seeded() -> (SeaOrmSlotRepository, i32) {
        let db = test_db().await;
        let court = SeaOrmCourtRepository::new(db.clone())
            .create(NewCourt {
                name: "Lapangan Lor".to_string(),
                sport: "Badminton".to_string(),
                indoor: true,
                surface: "Vinyl".to_string(),
                image_urls: vec![],
            })
            .await
            .unwrap();
        let repo = SeaOrmSlotRepository::new(db);
        let slots: Vec<NewSlot> = (7..10)
            .map(|h| NewSlot {
                key: key(court.id, h),
                price: 90_000,
            })
            .collect();
        assert_eq!(repo.insert_missing(&slots).await.unwrap(), 3);
        (repo, court.id)
    }

    #[tokio::test]
    async fn insert_missing_is_idempotent() {
        let (repo, court) = seeded().await;
        let again = vec![
            NewSlot {
                key: key(court, 7),
                price: 1,
            },
            NewSlot {
                key: key(court, 10),
                price: 90_000,
            },
        ];
        assert_eq!(repo.insert_missing(&again).await.unwrap(), 1);
        assert_eq!(repo.insert_missing(&again).await.unwrap(), 0);

        let listed = repo.list_for_court(court, Some(day())).await.unwrap();
        assert_eq!(listed.len(), 4);
        assert_eq!(listed[0].price, 90_000);
        assert!(listed.windows(2).all(|w| w[0].start_min < w[1].start_min));
    }

    #[tokio::test]
    async fn hold_is_all_or_nothing() {
        let (repo, court) = seeded().await;
        let expires = Utc::now() + Duration::minutes(15);
        let first = HoldId::new();

        let attempt = repo.hold(&[key(court, 8)], first, expires).await.unwrap();
        match attempt {
            HoldAttempt::Held(slots) => {
                assert_eq!(slots.len(), 1);
                assert_eq!(slots[0].status, SlotStatus::Held);
                assert_eq!(slots[0].hold_id, Some(first));
            }
            other => panic!("expected hold, got {:?}", other),
        }

        let attempt = repo
            .hold(
                &[key(court, 7), key(court, 8), key(court, 9)],
                HoldId::new(),
                expires,
            )
            .await
            .unwrap();
        assert_eq!(attempt, HoldAttempt::Unavailable(key(court, 8)));
        assert!(repo.find(&key(court, 7)).await.unwrap().unwrap().is_free());
        assert!(repo.find(&key(court, 9)).await.unwrap().unwrap().is_free());

        let unknown = SlotKey::new(court, day(), 0, 60);
        let attempt = repo
            .hold(&[key(court, 7), unknown], HoldId::new(), expires)
            .await
            .unwrap();
        assert_eq!(attempt, HoldAttempt::Unknown(unknown));
        assert!(repo.find(&key(court, 7)).await.unwrap().unwrap().is_free());
    }

    #[tokio::test]
    async fn commit_requires_live_hold() {
        let (repo, court) = seeded().await;
        let now = Utc::now();
        let hold = HoldId::new();
        let keys = [key(court, 7), key(court, 8)];
        repo.hold(&keys, hold, now + Duration::minutes(15)).await.unwrap();

        assert!(!repo.commit_hold(HoldId::new(), &keys, now).await.unwrap());
        assert!(!repo
            .commit_hold(hold, &keys, now + Duration::minutes(16))
            .await
            .unwrap());
        assert!(repo.commit_hold(hold, &keys, now).await.unwrap());

        let slot = repo.find(&keys[0]).await.unwrap().unwrap();
        assert_eq!(slot.status, SlotStatus::Booked);
        assert_eq!(slot.hold_id, Some(hold));
        assert!(slot.hold_expires_at.is_none());
    }

    #[tokio::test]
    async fn releases_are_scoped_by_hold_and_status() {
        let (repo, court) = seeded().await;
        let now = Utc::now();
        let hold = HoldId::new();
        repo.hold(&[key(court, 7)], hold, now + Duration::minutes(15))
            .await
            .unwrap();

        assert_eq!(repo.release_hold(HoldId::new(), &[key(court, 7)]).await.unwrap(), 0);
        assert_eq!(repo.release_booked(hold, &[key(court, 7)]).await.unwrap(), 0);
        assert_eq!(repo.release_hold(hold, &[key(court, 7)]).await.unwrap(), 1);
        assert_eq!(repo.release_hold(hold, &[key(court, 7)]).await.unwrap(), 0);

        let booked = HoldId::new();
        repo.hold(&[key(court, 8)], booked, now + Duration::minutes(15))
            .await
            .unwrap();
        assert!(repo.commit_hold(booked, &[key(court, 8)], now).await.unwrap());
        assert_eq!(repo.release_booked(booked, &[key(court, 8)]).await.unwrap(), 1);

        let slot = repo.find(&key(court, 8)).await.unwrap().unwrap();
        assert!(slot.is_free());
        assert!(slot.hold_id.is_none());
    }

    #[tokio::test]
    async fn sweep_frees_only_expired_holds() {
        let (repo, court) = seeded().await;
        let now = Utc::now();
        repo.hold(&[key(court, 7)], HoldId::new(), now - Duration::seconds(1))
            .await
            .unwrap();
        repo.hold(&[key(court, 8)], HoldId::new(), now + Duration::minutes(15))
            .await
            .unwrap();

        assert_eq!(repo.release_expired_holds(now).await.unwrap(), 1);
        assert!(repo.find(&key(court, 7)).await.unwrap().unwrap().is_free());
        assert_eq!(
            repo.find(&key(court, 8)).await.unwrap().unwrap().status,
            SlotStatus::Held
        );
    }
}
