pub mod analysis_locks;
pub mod lifecycle;
pub mod paper_trader;
pub mod setup_service;

pub use analysis_locks::{AnalysisLock, AnalysisLockRegistry};
pub use paper_trader::{PaperTrader, TradeEventMessage};
pub use setup_service::SetupService;
