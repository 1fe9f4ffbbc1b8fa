//! SeaORM implementation of BookingRepository

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, warn};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};

use super::db_err;
use crate::domain::{
    Booking, BookingItem, BookingRepository, BookingStatus, DomainError, DomainResult, HoldId,
};
use crate::infrastructure::database::entities::{booking, booking_item};

pub struct SeaOrmBookingRepository {
    db: DatabaseConnection,
}

impl SeaOrmBookingRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn items_by_booking(
        &self,
        booking_ids: Vec<i32>,
    ) -> DomainResult<HashMap<i32, Vec<BookingItem>>> {
        let items = booking_item::Entity::find()
            .filter(booking_item::Column::BookingId.is_in(booking_ids))
            .order_by_asc(booking_item::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let mut grouped: HashMap<i32, Vec<BookingItem>> = HashMap::new();
        for item in items {
            grouped
                .entry(item.booking_id)
                .or_default()
                .push(item_to_domain(item));
        }
        Ok(grouped)
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn item_to_domain(m: booking_item::Model) -> BookingItem {
    BookingItem {
        court_id: m.court_id,
        date: m.date,
        start_min: m.start_min,
        end_min: m.end_min,
        price: m.price,
    }
}

fn model_to_domain(m: booking::Model, items: Vec<BookingItem>) -> DomainResult<Booking> {
    let status = BookingStatus::parse(&m.status).ok_or_else(|| {
        DomainError::storage(format!("booking {} has unknown status '{}'", m.code, m.status))
    })?;
    let hold_id: HoldId = m.hold_id.parse().map_err(|e| {
        DomainError::storage(format!("booking {} has malformed hold id: {}", m.code, e))
    })?;

    Ok(Booking {
        id: m.id,
        code: m.code,
        total: m.total,
        status,
        hold_id,
        items,
        payment_token: m.payment_token,
        redirect_url: m.redirect_url,
        created_at: m.created_at,
        updated_at: m.updated_at,
    })
}

fn insert_err(code: &str, e: DbErr) -> DomainError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            DomainError::Conflict(format!("booking code {}", code))
        }
        _ => db_err(e),
    }
}

// ── BookingRepository impl ──────────────────────────────────────

#[async_trait]
impl BookingRepository for SeaOrmBookingRepository {
    async fn insert(&self, b: &Booking) -> DomainResult<Booking> {
        debug!("Saving booking {} ({} items)", b.code, b.items.len());
        let txn = self.db.begin().await.map_err(db_err)?;

        let stored = booking::ActiveModel {
            id: NotSet,
            code: Set(b.code.clone()),
            total: Set(b.total),
            status: Set(b.status.as_str().to_string()),
            hold_id: Set(b.hold_id.to_string()),
            payment_token: Set(b.payment_token.clone()),
            redirect_url: Set(b.redirect_url.clone()),
            created_at: Set(b.created_at),
            updated_at: Set(b.updated_at),
        }
        .insert(&txn)
        .await
        .map_err(|e| insert_err(&b.code, e))?;

        for item in &b.items {
            booking_item::ActiveModel {
                id: NotSet,
                booking_id: Set(stored.id),
                court_id: Set(item.court_id),
                date: Set(item.date),
                start_min: Set(item.start_min),
                end_min: Set(item.end_min),
                price: Set(item.price),
            }
            .insert(&txn)
            .await
            .map_err(db_err)?;
        }

        txn.commit().await.map_err(db_err)?;

        let mut saved = b.clone();
        saved.id = stored.id;
        Ok(saved)
    }

    async fn find_by_code(&self, code: &str) -> DomainResult<Option<Booking>> {
        let Some(found) = booking::Entity::find()
            .filter(booking::Column::Code.eq(code))
            .one(&self.db)
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };

        let mut items = self.items_by_booking(vec![found.id]).await?;
        let items = items.remove(&found.id).unwrap_or_default();
        model_to_domain(found, items).map(Some)
    }

    async fn list_recent(&self, limit: u64) -> DomainResult<Vec<Booking>> {
        let rows = booking::Entity::find()
            .order_by_desc(booking::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let mut items = self
            .items_by_booking(rows.iter().map(|b| b.id).collect())
            .await?;

        rows.into_iter()
            .map(|b| {
                let its = items.remove(&b.id).unwrap_or_default();
                model_to_domain(b, its)
            })
            .collect()
    }

    async fn compare_and_set_status(
        &self,
        code: &str,
        expected: BookingStatus,
        next: BookingStatus,
    ) -> DomainResult<bool> {
        let result = booking::Entity::update_many()
            .col_expr(booking::Column::Status, Expr::value(next.as_str()))
            .col_expr(booking::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(booking::Column::Code.eq(code))
            .filter(booking::Column::Status.eq(expected.as_str()))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 1 {
            return Ok(true);
        }

        let exists = booking::Entity::find()
            .filter(booking::Column::Code.eq(code))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .is_some();
        if !exists {
            warn!("Status change for unknown booking {}", code);
            return Err(DomainError::NotFound {
                entity: "Booking",
                field: "code",
                value: code.to_string(),
            });
        }
        Ok(false)
    }
}
