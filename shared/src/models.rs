//! Domain models shared between the tracker, the analysis pipeline and the
//! persistence layer.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::StringLen;
use serde::{Deserialize, Serialize};

/// Direction of a proposed trade.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
pub enum TradeDirection {
    #[sea_orm(string_value = "Long")]
    Long,
    #[sea_orm(string_value = "Short")]
    Short,
}

/// Lifecycle status of a trade record.
///
/// Transitions only ever move forward along the lifecycle graph; the five
/// `Closed*`/`Expired`/`Cancelled` variants are terminal and absorbing.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum TradeStatus {
    /// Setup logged, entry not yet touched.
    #[sea_orm(string_value = "POTENTIAL")]
    Potential,
    /// Entry touched, position running.
    #[sea_orm(string_value = "ACTIVE")]
    Active,
    /// TP1 taken, remainder running with the stop at breakeven.
    #[sea_orm(string_value = "PARTIAL_PROFIT")]
    PartialProfit,
    /// Final take-profit reached.
    #[sea_orm(string_value = "CLOSED_TP")]
    ClosedTp,
    /// Original stop-loss hit.
    #[sea_orm(string_value = "CLOSED_SL")]
    ClosedSl,
    /// Breakeven stop hit after partial profit.
    #[sea_orm(string_value = "CLOSED_BE")]
    ClosedBe,
    /// Entry never touched within the expiration window.
    #[sea_orm(string_value = "EXPIRED")]
    Expired,
    /// Stop level swept before the entry was ever reached.
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

impl TradeStatus {
    pub const TERMINAL: [TradeStatus; 5] = [
        TradeStatus::ClosedTp,
        TradeStatus::ClosedSl,
        TradeStatus::ClosedBe,
        TradeStatus::Expired,
        TradeStatus::Cancelled,
    ];

    pub fn is_terminal(&self) -> bool {
        Self::TERMINAL.contains(self)
    }
}

/// Kind of audit event appended to a trade's history.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum TradeEventType {
    #[sea_orm(string_value = "ACTIVATED")]
    Activated,
    #[sea_orm(string_value = "TP1_HIT")]
    Tp1Hit,
    #[sea_orm(string_value = "SL_MOVED_TO_BE")]
    SlMovedToBe,
    #[sea_orm(string_value = "CLOSED")]
    Closed,
}

/// OHLCV candle for one time bucket, as returned by a candle source.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// A directional setup proposed by the analysis pipeline.
///
/// Immutable input to the tracker; price-level sanity (stop below entry
/// below targets for longs, mirrored for shorts) is validated upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposedSetup {
    pub symbol: String,
    pub interval: String,
    pub exchange: String,
    pub direction: TradeDirection,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit_1: Option<f64>,
    pub take_profit_2: f64,
    /// Model conviction on a 0-10 scale.
    pub confidence: i32,
    pub created_at: DateTime<Utc>,
}
