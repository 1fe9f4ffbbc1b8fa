//! Slot entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "slots")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub court_id: i32,
    pub date: Date,

    /// Minutes since 00:00
    pub start_min: i32,
    pub end_min: i32,

    /// Minor currency units
    pub price: i64,

    /// Slot status: free, held, booked
    pub status: String,

    /// Hold that claimed the slot (UUID)
    #[sea_orm(nullable)]
    pub hold_id: Option<String>,

    #[sea_orm(nullable)]
    pub hold_expires_at: Option<DateTimeUtc>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::court::Entity",
        from = "Column::CourtId",
        to = "super::court::Column::Id"
    )]
    Court,
}

impl Related<super::court::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Court.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
