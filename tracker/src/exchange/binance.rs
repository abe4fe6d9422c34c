//! Binance spot REST kline source.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use shared::models::Candle;
use std::time::Duration;
use tracing::debug;

use super::{CandleSource, FetchError};

const BASE_URL: &str = "https://api.binance.com";
const MAX_KLINES: u32 = 1000;

pub struct BinanceCandleSource {
    client: reqwest::Client,
    base_url: String,
}

impl BinanceCandleSource {
    pub fn new() -> Result<Self, anyhow::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
        })
    }

    /// "BTC/USDT" -> "BTCUSDT"
    fn normalize_symbol(symbol: &str) -> String {
        symbol.replace('/', "").to_uppercase()
    }

    fn parse_kline(raw: &Value) -> Result<Candle, FetchError> {
        let fields = raw
            .as_array()
            .ok_or_else(|| FetchError::Payload(format!("kline is not an array: {raw}")))?;
        if fields.len() < 6 {
            return Err(FetchError::Payload(format!(
                "kline has {} fields, expected at least 6",
                fields.len()
            )));
        }

        let open_time_ms = fields[0]
            .as_i64()
            .ok_or_else(|| FetchError::Payload(format!("bad open time: {}", fields[0])))?;
        let timestamp = DateTime::from_timestamp_millis(open_time_ms)
            .ok_or_else(|| FetchError::Payload(format!("open time out of range: {open_time_ms}")))?;

        let price = |idx: usize| -> Result<f64, FetchError> {
            fields[idx]
                .as_str()
                .and_then(|s| s.parse::<f64>().ok())
                .ok_or_else(|| FetchError::Payload(format!("bad kline field {idx}: {}", fields[idx])))
        };

        Ok(Candle {
            timestamp,
            open: price(1)?,
            high: price(2)?,
            low: price(3)?,
            close: price(4)?,
            volume: price(5)?,
        })
    }
}

#[async_trait]
impl CandleSource for BinanceCandleSource {
    /// Pages through `/api/v3/klines` from `since` until a short page
    /// signals the end of available history.
    async fn fetch_candles(
        &self,
        symbol: &str,
        interval: &str,
        exchange: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Candle>, FetchError> {
        if !exchange.eq_ignore_ascii_case("binance") {
            return Err(FetchError::UnsupportedExchange(exchange.to_string()));
        }

        let url = format!("{}/api/v3/klines", self.base_url);
        let mut candles: Vec<Candle> = Vec::new();
        let mut start = since.timestamp_millis();

        loop {
            let response = self
                .client
                .get(&url)
                .query(&[
                    ("symbol", Self::normalize_symbol(symbol)),
                    ("interval", interval.to_string()),
                    ("startTime", start.to_string()),
                    ("limit", MAX_KLINES.to_string()),
                ])
                .send()
                .await?
                .error_for_status()?;

            let raw: Vec<Value> = response.json().await?;
            let page = raw
                .iter()
                .map(Self::parse_kline)
                .collect::<Result<Vec<_>, _>>()?;

            let next = next_page_start(&page, start);
            candles.extend(page);
            match next {
                Some(next_start) => start = next_start,
                None => break,
            }
        }

        candles.sort_by_key(|c| c.timestamp);

        debug!(
            "Fetched {} candles for {} {} since {}",
            candles.len(),
            symbol,
            interval,
            since
        );
        Ok(candles)
    }
}

/// Start of the next page, or `None` when `page` was the last one. A
/// short page means the exchange ran out of history; a cursor that does
/// not move strictly forward would refetch the same rows forever.
fn next_page_start(page: &[Candle], current_start: i64) -> Option<i64> {
    if page.len() < MAX_KLINES as usize {
        return None;
    }
    let next = page.last()?.timestamp.timestamp_millis() + 1;
    (next > current_start).then_some(next)
}
