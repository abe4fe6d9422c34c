//! Market-data access for the tracker.

mod binance;

pub use binance::BinanceCandleSource;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::models::Candle;
use thiserror::Error;

/// Transient candle-retrieval failure. A group that fails to fetch simply
/// carries over to the next monitoring pass unresolved.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected kline payload: {0}")]
    Payload(String),
    #[error("unsupported exchange: {0}")]
    UnsupportedExchange(String),
}

/// Supplier of ordered, append-only OHLCV history for one market.
#[async_trait]
pub trait CandleSource: Send + Sync {
    /// Fetch candles for `(symbol, interval, exchange)` from `since`
    /// (exclusive of anything older) through now, ascending by timestamp.
    async fn fetch_candles(
        &self,
        symbol: &str,
        interval: &str,
        exchange: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Candle>, FetchError>;
}
