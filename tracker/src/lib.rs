pub mod exchange;
pub mod repositories;
pub mod services;
pub mod state;
