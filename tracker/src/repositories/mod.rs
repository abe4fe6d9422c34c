pub mod trade_repository;

pub use trade_repository::{TradeFilter, TradeRepository};
