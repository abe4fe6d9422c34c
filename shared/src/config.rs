use dotenv::dotenv;

pub struct Config {
    pub database_url: String,
    /// Seconds between monitoring passes over open trades.
    pub poll_interval_secs: u64,
    /// How many candles a POTENTIAL setup may wait for activation.
    pub expiration_limit: usize,
    /// Trailing window for duplicate-setup suppression, in seconds.
    pub dedup_window_secs: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenv().ok();

        Ok(Config {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://crypto_data.db?mode=rwc".to_string()),
            poll_interval_secs: std::env::var("POLL_INTERVAL_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap_or(60),
            expiration_limit: std::env::var("SETUP_EXPIRATION_CANDLES")
                .unwrap_or_else(|_| "12".to_string())
                .parse()
                .unwrap_or(12),
            dedup_window_secs: std::env::var("DEDUP_WINDOW_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .unwrap_or(300),
        })
    }
}
