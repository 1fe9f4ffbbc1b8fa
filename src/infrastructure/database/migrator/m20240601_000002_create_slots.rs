//! Create slots table
//!
//! One row per bookable (court, date, time range). The unique index on the
//! natural key is what makes catalog generation idempotent.

use sea_orm_migration::prelude::*;

use super::m20240601_000001_create_courts::Courts;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Slots::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Slots::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Slots::CourtId).integer().not_null())
                    .col(ColumnDef::new(Slots::Date).date().not_null())
                    .col(ColumnDef::new(Slots::StartMin).integer().not_null())
                    .col(ColumnDef::new(Slots::EndMin).integer().not_null())
                    .col(ColumnDef::new(Slots::Price).big_integer().not_null())
                    .col(
                        ColumnDef::new(Slots::Status)
                            .string()
                            .not_null()
                            .default("free"),
                    )
                    .col(ColumnDef::new(Slots::HoldId).string())
                    .col(ColumnDef::new(Slots::HoldExpiresAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Slots::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Slots::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_slots_court")
                            .from(Slots::Table, Slots::CourtId)
                            .to(Courts::Table, Courts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_slots_key")
                    .table(Slots::Table)
                    .col(Slots::CourtId)
                    .col(Slots::Date)
                    .col(Slots::StartMin)
                    .col(Slots::EndMin)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Expiry sweep scans held slots by deadline
        manager
            .create_index(
                Index::create()
                    .name("idx_slots_status_expiry")
                    .table(Slots::Table)
                    .col(Slots::Status)
                    .col(Slots::HoldExpiresAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Slots::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Slots {
    Table,
    Id,
    CourtId,
    Date,
    StartMin,
    EndMin,
    Price,
    Status,
    HoldId,
    HoldExpiresAt,
    CreatedAt,
    UpdatedAt,
}
