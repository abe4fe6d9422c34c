//! `SeaORM` Entity, @generated manually

use sea_orm::entity::prelude::*;

use crate::models::TradeEventType;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "trade_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub trade_id: i64,
    pub timestamp: DateTimeUtc,
    pub event_type: TradeEventType,
    #[sea_orm(column_type = "Text", nullable)]
    pub details_json: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::trade_records::Entity",
        from = "Column::TradeId",
        to = "super::trade_records::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    TradeRecords,
}

impl Related<super::trade_records::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TradeRecords.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
