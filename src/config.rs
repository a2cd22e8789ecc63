use std::env;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    /// How often the retention cleanup task runs.
    pub cleanup_interval_secs: u64,
    /// Delivered orders older than this are purged.
    pub delivered_retention_hours: i64,
    /// Driver locations older than this are cleared and never read as fresh.
    pub location_freshness_mins: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            cleanup_interval_secs: parse_or_default("CLEANUP_INTERVAL_SECS", 300)?,
            delivered_retention_hours: parse_or_default("DELIVERED_RETENTION_HOURS", 24)?,
            location_freshness_mins: parse_or_default("LOCATION_FRESHNESS_MINS", 20)?,
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
