pub mod trade_events;
pub mod trade_records;
