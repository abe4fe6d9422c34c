use anyhow::Result;
use migration::{Migrator, MigratorTrait};
use sea_orm::DatabaseConnection;
use shared::{get_db_connection, Config};
use std::sync::Arc;

use crate::repositories::TradeRepository;
use crate::services::{AnalysisLock, AnalysisLockRegistry};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub repo: Arc<TradeRepository>,
    pub analysis_lock: AnalysisLock,
    pub lock_registry: Arc<AnalysisLockRegistry>,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new() -> Result<Self> {
        let config = Config::from_env()?;
        let db = Arc::new(get_db_connection(&config.database_url).await?);
        Migrator::up(db.as_ref(), None).await?;
        tracing::info!("Database connected and migrated");

        let repo = Arc::new(TradeRepository::new(db.clone()));

        Ok(AppState {
            db,
            repo,
            analysis_lock: AnalysisLock::new(),
            lock_registry: Arc::new(AnalysisLockRegistry::new()),
            config: Arc::new(config),
        })
    }
}
