//! `SeaORM` Entity, @generated manually

use sea_orm::entity::prelude::*;

use crate::models::{TradeDirection, TradeStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "trade_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub symbol: String,
    pub interval: String,
    pub exchange: String,
    pub direction: TradeDirection,
    pub status: TradeStatus,
    pub confidence: i32,
    pub entry_price: f64,
    /// Moved to the entry price (breakeven) once TP1 is taken.
    pub stop_loss: f64,
    pub take_profit_1: Option<f64>,
    pub take_profit_2: f64,
    pub is_partially_closed: bool,
    pub created_at: DateTimeUtc,
    /// Open time of the newest candle this record has been advanced
    /// through; candles at or before it are never replayed.
    pub last_processed_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::trade_events::Entity")]
    TradeEvents,
}

impl Related<super::trade_events::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TradeEvents.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
