//! Mutual exclusion between the analysis pipeline and the tracker.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

/// Global "analysis in progress" lock.
///
/// The setup-generation pipeline holds it for the duration of a run; the
/// tracker only probes it and skips its monitoring pass while held.
#[derive(Clone, Default)]
pub struct AnalysisLock {
    inner: Arc<Mutex<()>>,
}

impl AnalysisLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self) -> OwnedMutexGuard<()> {
        self.inner.clone().lock_owned().await
    }

    /// Non-blocking probe. The tracker never acquires this lock.
    pub fn is_locked(&self) -> bool {
        self.inner.try_lock().is_err()
    }
}

/// Lazily-populated registry of per-`(symbol, interval)` locks.
///
/// Two concurrent analysis runs on the same market/timeframe serialize
/// here, which is what keeps the dedup window in `SetupService` honest.
/// Entries live for the life of the process; the key set is bounded by
/// the user's tracked symbols.
#[derive(Default)]
pub struct AnalysisLockRegistry {
    locks: Mutex<HashMap<(String, String), Arc<Mutex<()>>>>,
}

impl AnalysisLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, symbol: &str, interval: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry((symbol.to_string(), interval.to_string()))
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        debug!("Waiting for analysis lock on {} {}", symbol, interval);
        lock.lock_owned().await
    }
}
