//! Polling loop that advances every open trade record against fresh
//! market data once per period.

use anyhow::Result;
use shared::entity::trade_records;
use shared::models::{Candle, TradeEventType};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::exchange::CandleSource;
use crate::repositories::TradeRepository;
use crate::services::analysis_locks::AnalysisLock;
use crate::services::lifecycle::{self, TradeChange, TradeView};

/// Broadcast copy of every appended trade event, for notification and UI
/// consumers. The tracker does not care whether anyone listens.
#[derive(Debug, Clone)]
pub struct TradeEventMessage {
    pub trade_id: i64,
    pub event_type: TradeEventType,
    pub price: f64,
}

pub struct PaperTrader {
    repo: Arc<TradeRepository>,
    candle_source: Arc<dyn CandleSource>,
    analysis_lock: AnalysisLock,
    poll_interval: Duration,
    expiration_limit: usize,
    running: AtomicBool,
    events_tx: broadcast::Sender<TradeEventMessage>,
}

impl PaperTrader {
    pub fn new(
        repo: Arc<TradeRepository>,
        candle_source: Arc<dyn CandleSource>,
        analysis_lock: AnalysisLock,
        poll_interval: Duration,
        expiration_limit: usize,
    ) -> Self {
        let (events_tx, _) = broadcast::channel(256);
        Self {
            repo,
            candle_source,
            analysis_lock,
            poll_interval,
            expiration_limit,
            running: AtomicBool::new(false),
            events_tx,
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<TradeEventMessage> {
        self.events_tx.subscribe()
    }

    /// Run monitoring passes until `stop()` is called. A failed pass is
    /// logged and the next one still runs; the loop degrades to a no-op
    /// rather than taking the process down.
    pub async fn run(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("[PaperTrader] monitoring loop started");
        let mut ticker = interval(self.poll_interval);
        while self.running.load(Ordering::SeqCst) {
            ticker.tick().await;
            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            if let Err(e) = self.check_open_trades().await {
                error!("[PaperTrader] unexpected error in monitoring pass: {e:#}");
            }
        }
        info!("[PaperTrader] monitoring loop stopped");
    }

    /// Request a stop between passes; a pass that has started runs to
    /// completion over all groups.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// One monitoring pass over all open trade records.
    pub async fn check_open_trades(&self) -> Result<()> {
        if self.analysis_lock.is_locked() {
            info!("[PaperTrader] pass skipped, an analysis run is in progress");
            return Ok(());
        }

        let open_trades = self.repo.get_open().await?;
        if open_trades.is_empty() {
            return Ok(());
        }

        // One fetch per (symbol, interval, exchange), covering the oldest
        // record's full history since creation.
        let mut groups: HashMap<(String, String, String), Vec<trade_records::Model>> =
            HashMap::new();
        for trade in open_trades {
            groups
                .entry((
                    trade.symbol.clone(),
                    trade.interval.clone(),
                    trade.exchange.clone(),
                ))
                .or_default()
                .push(trade);
        }

        for ((symbol, interval, exchange), trades) in groups {
            let Some(since) = trades.iter().map(|t| t.created_at).min() else {
                continue;
            };

            let candles = match self
                .candle_source
                .fetch_candles(&symbol, &interval, &exchange, since)
                .await
            {
                Ok(candles) => candles,
                Err(e) => {
                    warn!(
                        "[PaperTrader] candle fetch failed for {} {} on {}: {}",
                        symbol, interval, exchange, e
                    );
                    continue;
                }
            };
            if candles.is_empty() {
                continue;
            }

            for trade in trades {
                if let Err(e) = self.advance_trade(&trade, &candles).await {
                    error!("[PaperTrader] failed to advance trade {}: {e:#}", trade.id);
                }
            }
        }

        Ok(())
    }

    /// Run one record through the state machine and persist every change
    /// immediately, in emission order. Only candles past the record's
    /// replay floor are fed in; the floor then moves past them, so a later
    /// pass re-fetching the same range produces no further transitions.
    async fn advance_trade(
        &self,
        trade: &trade_records::Model,
        candles: &[Candle],
    ) -> Result<()> {
        let floor = trade.last_processed_at.unwrap_or(trade.created_at);
        let relevant: Vec<Candle> = candles
            .iter()
            .filter(|c| c.timestamp > floor)
            .copied()
            .collect();
        if relevant.is_empty() {
            return Ok(());
        }

        // Expiration counts every candle since creation, not just the
        // ones past the replay floor.
        let seen_since_setup = candles
            .iter()
            .filter(|c| c.timestamp > trade.created_at)
            .count();

        let mut view = TradeView {
            direction: trade.direction,
            status: trade.status,
            entry_price: trade.entry_price,
            stop_loss: trade.stop_loss,
            take_profit_1: trade.take_profit_1,
            take_profit_2: trade.take_profit_2,
        };

        for change in
            lifecycle::advance(&mut view, &relevant, seen_since_setup, self.expiration_limit)
        {
            match change {
                TradeChange::Status(status) => {
                    self.repo.update_status(trade.id, status).await?;
                }
                TradeChange::StopLoss(price) => {
                    self.repo.update_stop_loss(trade.id, price).await?;
                }
                TradeChange::Event { event_type, price } => {
                    self.repo
                        .append_event(trade.id, event_type, serde_json::json!({ "price": price }))
                        .await?;
                    let _ = self.events_tx.send(TradeEventMessage {
                        trade_id: trade.id,
                        event_type,
                        price,
                    });
                }
            }
        }

        if let Some(last) = relevant.last() {
            self.repo
                .update_last_processed(trade.id, last.timestamp)
                .await?;
        }

        Ok(())
    }
}
