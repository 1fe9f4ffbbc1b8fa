//! Create courts and court_images tables

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Courts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Courts::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Courts::Name).string().not_null())
                    .col(ColumnDef::new(Courts::Sport).string().not_null())
                    .col(
                        ColumnDef::new(Courts::Indoor)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Courts::Surface).string().not_null())
                    .col(
                        ColumnDef::new(Courts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Courts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CourtImages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CourtImages::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CourtImages::CourtId).integer().not_null())
                    .col(ColumnDef::new(CourtImages::Url).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_court_images_court")
                            .from(CourtImages::Table, CourtImages::CourtId)
                            .to(Courts::Table, Courts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CourtImages::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Courts::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Courts {
    Table,
    Id,
    Name,
    Sport,
    Indoor,
    Surface,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
pub enum CourtImages {
    Table,
    Id,
    CourtId,
    Url,
}
