use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracker::exchange::{BinanceCandleSource, CandleSource};
use tracker::services::PaperTrader;
use tracker::state::AppState;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    tracing::info!("Starting trade lifecycle tracker...");

    let state = Arc::new(AppState::new().await?);
    let candle_source: Arc<dyn CandleSource> = Arc::new(BinanceCandleSource::new()?);

    let trader = Arc::new(PaperTrader::new(
        state.repo.clone(),
        candle_source,
        state.analysis_lock.clone(),
        Duration::from_secs(state.config.poll_interval_secs),
        state.config.expiration_limit,
    ));

    let runner = trader.clone();
    let loop_handle = tokio::spawn(async move { runner.run().await });

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested, stopping after the current pass");
    trader.stop();
    loop_handle.await?;

    Ok(())
}
