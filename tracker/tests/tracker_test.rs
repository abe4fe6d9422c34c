//! Integration tests: repository, dedup guard and monitoring passes
//! against an in-memory sqlite store and a scripted candle source.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use shared::models::{Candle, ProposedSetup, TradeDirection, TradeEventType, TradeStatus};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracker::exchange::{CandleSource, FetchError};
use tracker::repositories::{TradeFilter, TradeRepository};
use tracker::services::{AnalysisLock, AnalysisLockRegistry, PaperTrader, SetupService};

/// Scripted candle source: per-symbol series, optionally failing symbols.
#[derive(Clone, Default)]
struct MockCandleSource {
    series: Arc<Mutex<HashMap<String, Vec<Candle>>>>,
    failing: Arc<Mutex<Vec<String>>>,
}

impl MockCandleSource {
    fn push(&self, symbol: &str, candle: Candle) {
        self.series
            .lock()
            .unwrap()
            .entry(symbol.to_string())
            .or_default()
            .push(candle);
    }

    fn fail(&self, symbol: &str) {
        self.failing.lock().unwrap().push(symbol.to_string());
    }
}

#[async_trait]
impl CandleSource for MockCandleSource {
    async fn fetch_candles(
        &self,
        symbol: &str,
        _interval: &str,
        _exchange: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Candle>, FetchError> {
        if self.failing.lock().unwrap().iter().any(|s| s == symbol) {
            return Err(FetchError::Payload("simulated exchange outage".to_string()));
        }
        Ok(self
            .series
            .lock()
            .unwrap()
            .get(symbol)
            .map(|series| {
                series
                    .iter()
                    .filter(|c| c.timestamp >= since)
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }
}

async fn test_db() -> DatabaseConnection {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1);
    let db = Database::connect(opts).await.expect("sqlite connect");
    Migrator::up(&db, None).await.expect("migrations");
    db
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap()
}

fn candle_at(minutes: i64, low: f64, high: f64) -> Candle {
    Candle {
        timestamp: t0() + ChronoDuration::minutes(minutes),
        open: (low + high) / 2.0,
        high,
        low,
        close: (low + high) / 2.0,
        volume: 1000.0,
    }
}

fn long_setup(symbol: &str) -> ProposedSetup {
    ProposedSetup {
        symbol: symbol.to_string(),
        interval: "1h".to_string(),
        exchange: "binance".to_string(),
        direction: TradeDirection::Long,
        entry_price: 100.0,
        stop_loss: 90.0,
        take_profit_1: Some(105.0),
        take_profit_2: 120.0,
        confidence: 7,
        created_at: t0(),
    }
}

fn make_trader(
    repo: Arc<TradeRepository>,
    source: &MockCandleSource,
    lock: AnalysisLock,
) -> PaperTrader {
    PaperTrader::new(
        repo,
        Arc::new(source.clone()),
        lock,
        Duration::from_secs(60),
        12,
    )
}

#[tokio::test]
async fn duplicate_setup_within_window_creates_one_record() {
    let db = test_db().await;
    let repo = Arc::new(TradeRepository::new(Arc::new(db)));
    let service = SetupService::new(repo.clone(), ChronoDuration::minutes(5));

    let setup = long_setup("BTC/USDT");
    assert!(service.submit_setup(&setup).await.unwrap().is_some());
    assert!(service.submit_setup(&setup).await.unwrap().is_none());

    let all = repo.list(&TradeFilter::default()).await.unwrap();
    assert_eq!(all.len(), 1);

    // Opposite direction is a different signal, not a duplicate.
    let mut short = long_setup("BTC/USDT");
    short.direction = TradeDirection::Short;
    short.stop_loss = 110.0;
    short.take_profit_1 = Some(95.0);
    short.take_profit_2 = 80.0;
    assert!(service.submit_setup(&short).await.unwrap().is_some());

    // Same signal again outside the trailing window.
    let mut later = long_setup("BTC/USDT");
    later.created_at = t0() + ChronoDuration::minutes(10);
    assert!(service.submit_setup(&later).await.unwrap().is_some());
}

#[tokio::test]
async fn open_records_exclude_terminal_statuses() {
    let db = test_db().await;
    let repo = Arc::new(TradeRepository::new(Arc::new(db)));

    let record = repo.create(&long_setup("BTC/USDT")).await.unwrap();
    assert_eq!(record.status, TradeStatus::Potential);
    assert_eq!(repo.get_open().await.unwrap().len(), 1);

    repo.update_status(record.id, TradeStatus::ClosedTp)
        .await
        .unwrap();
    assert!(repo.get_open().await.unwrap().is_empty());

    // Point lookup still sees the closed record.
    let closed = repo.get_by_id(record.id).await.unwrap().unwrap();
    assert_eq!(closed.status, TradeStatus::ClosedTp);
}

#[tokio::test]
async fn full_lifecycle_in_one_pass_persists_states_and_events() {
    let db = test_db().await;
    let repo = Arc::new(TradeRepository::new(Arc::new(db)));
    let record = repo.create(&long_setup("BTC/USDT")).await.unwrap();

    let source = MockCandleSource::default();
    source.push("BTC/USDT", candle_at(1, 99.0, 101.0)); // entry touched
    source.push("BTC/USDT", candle_at(2, 101.0, 106.0)); // TP1 hit
    source.push("BTC/USDT", candle_at(3, 98.0, 119.0)); // breakeven stop hit

    let trader = make_trader(repo.clone(), &source, AnalysisLock::new());
    trader.check_open_trades().await.unwrap();

    let closed = repo.get_by_id(record.id).await.unwrap().unwrap();
    assert_eq!(closed.status, TradeStatus::ClosedBe);
    assert_eq!(closed.stop_loss, 100.0);
    assert!(closed.is_partially_closed);

    let events = repo.events_for_trade(record.id).await.unwrap();
    let kinds: Vec<TradeEventType> = events.iter().map(|e| e.event_type).collect();
    assert_eq!(
        kinds,
        vec![
            TradeEventType::Activated,
            TradeEventType::Tp1Hit,
            TradeEventType::SlMovedToBe,
            TradeEventType::Closed,
        ]
    );

    assert!(repo.get_open().await.unwrap().is_empty());
}

#[tokio::test]
async fn lifecycle_advances_across_passes() {
    let db = test_db().await;
    let repo = Arc::new(TradeRepository::new(Arc::new(db)));
    let record = repo.create(&long_setup("BTC/USDT")).await.unwrap();

    let source = MockCandleSource::default();
    let trader = make_trader(repo.clone(), &source, AnalysisLock::new());

    // Pass 1: entry touched, stop untouched.
    source.push("BTC/USDT", candle_at(1, 95.0, 101.0));
    trader.check_open_trades().await.unwrap();
    let active = repo.get_by_id(record.id).await.unwrap().unwrap();
    assert_eq!(active.status, TradeStatus::Active);

    // Pass 2: nothing new; the already-consumed touch must not re-fire.
    trader.check_open_trades().await.unwrap();
    assert_eq!(repo.events_for_trade(record.id).await.unwrap().len(), 1);
    assert_eq!(
        repo.get_by_id(record.id).await.unwrap().unwrap().status,
        TradeStatus::Active
    );

    // Pass 3: TP1 candle arrives.
    source.push("BTC/USDT", candle_at(2, 101.0, 106.0));
    trader.check_open_trades().await.unwrap();
    let partial = repo.get_by_id(record.id).await.unwrap().unwrap();
    assert_eq!(partial.status, TradeStatus::PartialProfit);
    assert_eq!(partial.stop_loss, 100.0);
    assert!(partial.is_partially_closed);
}

#[tokio::test]
async fn partial_profit_survives_replay_and_reaches_final_target() {
    let db = test_db().await;
    let repo = Arc::new(TradeRepository::new(Arc::new(db)));
    let record = repo.create(&long_setup("BTC/USDT")).await.unwrap();

    let source = MockCandleSource::default();
    let trader = make_trader(repo.clone(), &source, AnalysisLock::new());

    // Pass 1: activation candle, then TP1 candle; stop moves to entry.
    source.push("BTC/USDT", candle_at(1, 99.0, 101.0));
    source.push("BTC/USDT", candle_at(2, 101.0, 106.0));
    trader.check_open_trades().await.unwrap();
    let partial = repo.get_by_id(record.id).await.unwrap().unwrap();
    assert_eq!(partial.status, TradeStatus::PartialProfit);
    assert_eq!(partial.stop_loss, 100.0);

    // Pass 2: the source returns the same candles again. The activation
    // candle's low sits under the moved stop; replaying it must not
    // force-close the trade at breakeven.
    trader.check_open_trades().await.unwrap();
    let still_partial = repo.get_by_id(record.id).await.unwrap().unwrap();
    assert_eq!(still_partial.status, TradeStatus::PartialProfit);
    assert_eq!(repo.events_for_trade(record.id).await.unwrap().len(), 3);

    // Pass 3: the final target is still reachable.
    source.push("BTC/USDT", candle_at(3, 101.0, 121.0));
    trader.check_open_trades().await.unwrap();
    let closed = repo.get_by_id(record.id).await.unwrap().unwrap();
    assert_eq!(closed.status, TradeStatus::ClosedTp);

    let kinds: Vec<TradeEventType> = repo
        .events_for_trade(record.id)
        .await
        .unwrap()
        .iter()
        .map(|e| e.event_type)
        .collect();
    assert_eq!(
        kinds,
        vec![
            TradeEventType::Activated,
            TradeEventType::Tp1Hit,
            TradeEventType::SlMovedToBe,
            TradeEventType::Closed,
        ]
    );
}

#[tokio::test]
async fn pre_activation_candles_do_not_replay_against_active_records() {
    let db = test_db().await;
    let repo = Arc::new(TradeRepository::new(Arc::new(db)));
    let record = repo.create(&long_setup("BTC/USDT")).await.unwrap();

    let source = MockCandleSource::default();
    let trader = make_trader(repo.clone(), &source, AnalysisLock::new());

    // A candle above TP1 arrives while the setup is still POTENTIAL,
    // then a later candle fills the entry.
    source.push("BTC/USDT", candle_at(1, 106.0, 108.0));
    source.push("BTC/USDT", candle_at(2, 99.0, 101.0));
    trader.check_open_trades().await.unwrap();
    assert_eq!(
        repo.get_by_id(record.id).await.unwrap().unwrap().status,
        TradeStatus::Active
    );
    assert_eq!(repo.events_for_trade(record.id).await.unwrap().len(), 1);

    // Replaying the pre-activation candle against the now-ACTIVE record
    // must not fabricate a TP1 hit.
    trader.check_open_trades().await.unwrap();
    assert_eq!(
        repo.get_by_id(record.id).await.unwrap().unwrap().status,
        TradeStatus::Active
    );
    assert_eq!(repo.events_for_trade(record.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn potential_record_expires_when_entry_never_touched() {
    let db = test_db().await;
    let repo = Arc::new(TradeRepository::new(Arc::new(db)));
    let record = repo.create(&long_setup("BTC/USDT")).await.unwrap();

    let source = MockCandleSource::default();
    for minute in 1..=13 {
        source.push("BTC/USDT", candle_at(minute, 101.0, 103.0));
    }

    let trader = make_trader(repo.clone(), &source, AnalysisLock::new());
    trader.check_open_trades().await.unwrap();

    let expired = repo.get_by_id(record.id).await.unwrap().unwrap();
    assert_eq!(expired.status, TradeStatus::Expired);
    assert!(repo.events_for_trade(record.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn pass_is_skipped_while_analysis_lock_is_held() {
    let db = test_db().await;
    let repo = Arc::new(TradeRepository::new(Arc::new(db)));
    let record = repo.create(&long_setup("BTC/USDT")).await.unwrap();

    let source = MockCandleSource::default();
    source.push("BTC/USDT", candle_at(1, 95.0, 101.0));

    let lock = AnalysisLock::new();
    let trader = make_trader(repo.clone(), &source, lock.clone());

    let guard = lock.acquire().await;
    trader.check_open_trades().await.unwrap();
    assert_eq!(
        repo.get_by_id(record.id).await.unwrap().unwrap().status,
        TradeStatus::Potential
    );
    drop(guard);

    trader.check_open_trades().await.unwrap();
    assert_eq!(
        repo.get_by_id(record.id).await.unwrap().unwrap().status,
        TradeStatus::Active
    );
}

#[tokio::test]
async fn fetch_failure_for_one_group_does_not_stall_others() {
    let db = test_db().await;
    let repo = Arc::new(TradeRepository::new(Arc::new(db)));

    let btc = repo.create(&long_setup("BTC/USDT")).await.unwrap();
    let eth = repo.create(&long_setup("ETH/USDT")).await.unwrap();

    let source = MockCandleSource::default();
    source.fail("BTC/USDT");
    source.push("ETH/USDT", candle_at(1, 95.0, 101.0));

    let trader = make_trader(repo.clone(), &source, AnalysisLock::new());
    trader.check_open_trades().await.unwrap();

    // The failing group's record carries over unresolved.
    assert_eq!(
        repo.get_by_id(btc.id).await.unwrap().unwrap().status,
        TradeStatus::Potential
    );
    assert_eq!(
        repo.get_by_id(eth.id).await.unwrap().unwrap().status,
        TradeStatus::Active
    );
}

#[tokio::test]
async fn event_broadcast_reaches_subscribers() {
    let db = test_db().await;
    let repo = Arc::new(TradeRepository::new(Arc::new(db)));
    let record = repo.create(&long_setup("BTC/USDT")).await.unwrap();

    let source = MockCandleSource::default();
    source.push("BTC/USDT", candle_at(1, 95.0, 101.0));

    let trader = make_trader(repo.clone(), &source, AnalysisLock::new());
    let mut events = trader.subscribe_events();
    trader.check_open_trades().await.unwrap();

    let message = events.try_recv().unwrap();
    assert_eq!(message.trade_id, record.id);
    assert_eq!(message.event_type, TradeEventType::Activated);
    assert_eq!(message.price, 100.0);
}

#[tokio::test]
async fn deleting_records_cascades_their_events() {
    let db = test_db().await;
    let repo = Arc::new(TradeRepository::new(Arc::new(db)));
    let record = repo.create(&long_setup("BTC/USDT")).await.unwrap();
    repo.append_event(
        record.id,
        TradeEventType::Activated,
        serde_json::json!({ "price": 100.0 }),
    )
    .await
    .unwrap();

    assert_eq!(repo.delete(&[record.id]).await.unwrap(), 1);
    assert!(repo.get_by_id(record.id).await.unwrap().is_none());
    assert!(repo
        .events_for_trade(record.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn analysis_runs_on_one_market_serialize_while_others_proceed() {
    let registry = AnalysisLockRegistry::new();
    let guard = registry.acquire("BTC/USDT", "1h").await;

    // A different market/timeframe is not blocked.
    let other = tokio::time::timeout(
        Duration::from_millis(50),
        registry.acquire("ETH/USDT", "1h"),
    )
    .await;
    assert!(other.is_ok());

    // The same key waits for the running analysis to finish.
    let same = tokio::time::timeout(
        Duration::from_millis(50),
        registry.acquire("BTC/USDT", "1h"),
    )
    .await;
    assert!(same.is_err());

    drop(guard);
    let same = tokio::time::timeout(
        Duration::from_millis(50),
        registry.acquire("BTC/USDT", "1h"),
    )
    .await;
    assert!(same.is_ok());
}
