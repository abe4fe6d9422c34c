//! Durable store for trade records and their event history.
//!
//! Every method is a single atomic statement; the tracker persists each
//! state-machine change through here immediately, so a crash mid-pass
//! leaves already-processed records correctly updated.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::prelude::*;
use sea_orm::{ActiveValue, Order, QueryOrder};
use shared::entity::{trade_events, trade_records};
use shared::models::{ProposedSetup, TradeDirection, TradeEventType, TradeStatus};
use std::sync::Arc;
use tracing::info;

/// Optional filters for journal-style listings.
#[derive(Debug, Clone, Default)]
pub struct TradeFilter {
    pub symbol: Option<String>,
    pub status: Option<TradeStatus>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
}

pub struct TradeRepository {
    db: Arc<DatabaseConnection>,
}

impl TradeRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert a new POTENTIAL record copied from a proposed setup.
    pub async fn create(&self, setup: &ProposedSetup) -> Result<trade_records::Model> {
        let record = trade_records::ActiveModel {
            symbol: ActiveValue::Set(setup.symbol.clone()),
            interval: ActiveValue::Set(setup.interval.clone()),
            exchange: ActiveValue::Set(setup.exchange.clone()),
            direction: ActiveValue::Set(setup.direction),
            status: ActiveValue::Set(TradeStatus::Potential),
            confidence: ActiveValue::Set(setup.confidence),
            entry_price: ActiveValue::Set(setup.entry_price),
            stop_loss: ActiveValue::Set(setup.stop_loss),
            take_profit_1: ActiveValue::Set(setup.take_profit_1),
            take_profit_2: ActiveValue::Set(setup.take_profit_2),
            is_partially_closed: ActiveValue::Set(false),
            created_at: ActiveValue::Set(setup.created_at),
            ..Default::default()
        };

        let record = trade_records::Entity::insert(record)
            .exec_with_returning(self.db.as_ref())
            .await?;
        Ok(record)
    }

    /// All records not yet in a terminal status.
    pub async fn get_open(&self) -> Result<Vec<trade_records::Model>> {
        let records = trade_records::Entity::find()
            .filter(trade_records::Column::Status.is_not_in(TradeStatus::TERMINAL))
            .order_by(trade_records::Column::CreatedAt, Order::Asc)
            .all(self.db.as_ref())
            .await?;
        Ok(records)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<trade_records::Model>> {
        let record = trade_records::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?;
        Ok(record)
    }

    pub async fn update_status(&self, id: i64, status: TradeStatus) -> Result<()> {
        let mut record = trade_records::ActiveModel {
            id: ActiveValue::Unchanged(id),
            status: ActiveValue::Set(status),
            ..Default::default()
        };
        if status == TradeStatus::PartialProfit {
            record.is_partially_closed = ActiveValue::Set(true);
        }
        record.update(self.db.as_ref()).await?;
        info!("Trade {} moved to status {:?}", id, status);
        Ok(())
    }

    pub async fn update_stop_loss(&self, id: i64, price: f64) -> Result<()> {
        let record = trade_records::ActiveModel {
            id: ActiveValue::Unchanged(id),
            stop_loss: ActiveValue::Set(price),
            ..Default::default()
        };
        record.update(self.db.as_ref()).await?;
        info!("Trade {} stop-loss moved to {}", id, price);
        Ok(())
    }

    /// Advance the replay watermark to the newest candle consumed.
    pub async fn update_last_processed(&self, id: i64, ts: DateTime<Utc>) -> Result<()> {
        let record = trade_records::ActiveModel {
            id: ActiveValue::Unchanged(id),
            last_processed_at: ActiveValue::Set(Some(ts)),
            ..Default::default()
        };
        record.update(self.db.as_ref()).await?;
        Ok(())
    }

    /// Append one immutable audit event to a trade's history.
    pub async fn append_event(
        &self,
        trade_id: i64,
        event_type: TradeEventType,
        details: serde_json::Value,
    ) -> Result<trade_events::Model> {
        let event = trade_events::ActiveModel {
            trade_id: ActiveValue::Set(trade_id),
            timestamp: ActiveValue::Set(Utc::now()),
            event_type: ActiveValue::Set(event_type),
            details_json: ActiveValue::Set(Some(details.to_string())),
            ..Default::default()
        };
        let event = trade_events::Entity::insert(event)
            .exec_with_returning(self.db.as_ref())
            .await?;
        info!("Logged event {:?} for trade {}", event_type, trade_id);
        Ok(event)
    }

    pub async fn events_for_trade(&self, trade_id: i64) -> Result<Vec<trade_events::Model>> {
        let events = trade_events::Entity::find()
            .filter(trade_events::Column::TradeId.eq(trade_id))
            .order_by(trade_events::Column::Timestamp, Order::Asc)
            .order_by(trade_events::Column::Id, Order::Asc)
            .all(self.db.as_ref())
            .await?;
        Ok(events)
    }

    /// Dedup probe: is there already a record for this market, timeframe
    /// and direction created after `since`?
    pub async fn exists_recent(
        &self,
        symbol: &str,
        interval: &str,
        direction: TradeDirection,
        since: DateTime<Utc>,
    ) -> Result<bool> {
        let existing = trade_records::Entity::find()
            .filter(trade_records::Column::Symbol.eq(symbol))
            .filter(trade_records::Column::Interval.eq(interval))
            .filter(trade_records::Column::Direction.eq(direction))
            .filter(trade_records::Column::CreatedAt.gt(since))
            .one(self.db.as_ref())
            .await?;
        Ok(existing.is_some())
    }

    /// Journal listing, newest first.
    pub async fn list(&self, filter: &TradeFilter) -> Result<Vec<trade_records::Model>> {
        let mut query = trade_records::Entity::find();
        if let Some(symbol) = &filter.symbol {
            query = query.filter(trade_records::Column::Symbol.contains(symbol));
        }
        if let Some(status) = filter.status {
            query = query.filter(trade_records::Column::Status.eq(status));
        }
        if let Some(after) = filter.created_after {
            query = query.filter(trade_records::Column::CreatedAt.gte(after));
        }
        if let Some(before) = filter.created_before {
            query = query.filter(trade_records::Column::CreatedAt.lte(before));
        }
        let records = query
            .order_by(trade_records::Column::CreatedAt, Order::Desc)
            .all(self.db.as_ref())
            .await?;
        Ok(records)
    }

    /// User-initiated deletion; events cascade with the owning records.
    pub async fn delete(&self, ids: &[i64]) -> Result<u64> {
        let result = trade_records::Entity::delete_many()
            .filter(trade_records::Column::Id.is_in(ids.iter().copied()))
            .exec(self.db.as_ref())
            .await?;
        info!("Deleted {} trade record(s)", result.rows_affected);
        Ok(result.rows_affected)
    }
}
