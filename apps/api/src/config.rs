use anyhow::{Context, Result};

const DEFAULT_CASCADE_QUEUE: &str = "accounts:cascade-delete";

/// Application configuration loaded from environment variables.
/// Start-up fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Without Redis, cascade signals are only logged.
    pub redis_url: Option<String>,
    pub port: u16,
    pub rust_log: String,
    pub db_max_connections: u32,
    /// Redis list that receives the ids of deleted accounts.
    pub cascade_queue: String,
    /// Seconds between re-sends of undelivered cascade signals.
    pub cascade_retry_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: std::env::var("REDIS_URL").ok().filter(|v| !v.is_empty()),
            port: optional_env("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: optional_env("RUST_LOG", "info"),
            db_max_connections: optional_env("DB_MAX_CONNECTIONS", "10")
                .parse::<u32>()
                .context("DB_MAX_CONNECTIONS must be a positive integer")?,
            cascade_queue: optional_env("CASCADE_QUEUE", DEFAULT_CASCADE_QUEUE),
            cascade_retry_secs: optional_env("CASCADE_RETRY_SECS", "30")
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .context("CASCADE_RETRY_SECS must be a positive integer")?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
