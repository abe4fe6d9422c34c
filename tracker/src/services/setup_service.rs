//! Turns proposed setups into tracked trade records, suppressing
//! duplicate signals from concurrent or back-to-back analysis runs.

use anyhow::Result;
use chrono::Duration;
use shared::models::ProposedSetup;
use std::sync::Arc;
use tracing::{debug, info};

use crate::repositories::TradeRepository;

pub struct SetupService {
    repo: Arc<TradeRepository>,
    dedup_window: Duration,
}

impl SetupService {
    pub fn new(repo: Arc<TradeRepository>, dedup_window: Duration) -> Self {
        Self { repo, dedup_window }
    }

    /// Record a proposed setup unless an equivalent one already exists
    /// within the trailing dedup window. A duplicate is not an error; it
    /// is discarded silently and `None` is returned.
    pub async fn submit_setup(&self, setup: &ProposedSetup) -> Result<Option<i64>> {
        let since = setup.created_at - self.dedup_window;
        if self
            .repo
            .exists_recent(&setup.symbol, &setup.interval, setup.direction, since)
            .await?
        {
            debug!(
                "Duplicate {:?} setup for {} {} discarded",
                setup.direction, setup.symbol, setup.interval
            );
            return Ok(None);
        }

        let record = self.repo.create(setup).await?;
        info!(
            "Logged new {:?} setup #{} for {} {} (entry {}, sl {}, tp2 {})",
            setup.direction,
            record.id,
            setup.symbol,
            setup.interval,
            setup.entry_price,
            setup.stop_loss,
            setup.take_profit_2
        );
        Ok(Some(record.id))
    }
}
