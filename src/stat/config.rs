//! Stat runtime configuration from environment variables

use super::types::{StatType, TimeRange};
use chrono::{DateTime, TimeZone, Utc};
use std::env;

/// Configuration for the address stat runtime
///
/// Loaded from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct StatConfig {
    /// Path to SQLite database file
    pub db_path: String,

    /// Granularity of the contiguous primary stat stream
    pub primary_interval: StatType,

    /// First window start when no stat has been persisted yet
    ///
    /// Always aligned to a `primary_interval` boundary.
    pub start_time: DateTime<Utc>,

    /// How long to wait when no new window is available, in milliseconds
    pub poll_interval_ms: u64,

    /// JSON-RPC endpoint used as the external clock (system clock when unset)
    pub rpc_url: Option<String>,
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, value: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid { key, value } => write!(f, "invalid {}: {:?}", key, value),
        }
    }
}

impl std::error::Error for ConfigError {}

impl StatConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `ADDRSTAT_DB_PATH` (default: data/addrstat.db)
    /// - `ADDRESS_STAT_INTERVAL` (default: 1d; one of 10m, 1h, 1d)
    /// - `ADDRESS_STAT_START_TIME` (required; RFC 3339 or unix seconds)
    /// - `STAT_POLL_INTERVAL_MS` (default: 10000)
    /// - `CHAIN_RPC_URL` (optional)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading values through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let primary_interval = match lookup("ADDRESS_STAT_INTERVAL") {
            Some(value) => StatType::from_str(value.trim()).ok_or(ConfigError::Invalid {
                key: "ADDRESS_STAT_INTERVAL",
                value,
            })?,
            None => StatType::Day,
        };

        let raw_start = lookup("ADDRESS_STAT_START_TIME")
            .ok_or(ConfigError::Missing("ADDRESS_STAT_START_TIME"))?;
        let start_time = parse_instant(raw_start.trim())
            .map(|t| primary_interval.align_down(t))
            .filter(|t| first_cycle_fits(*t, primary_interval))
            .ok_or(ConfigError::Invalid {
                key: "ADDRESS_STAT_START_TIME",
                value: raw_start.clone(),
            })?;

        let poll_interval_ms = match lookup("STAT_POLL_INTERVAL_MS") {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "STAT_POLL_INTERVAL_MS",
                value,
            })?,
            None => 10_000,
        };

        Ok(Self {
            db_path: lookup("ADDRSTAT_DB_PATH").unwrap_or_else(|| "data/addrstat.db".to_string()),
            primary_interval,
            start_time,
            poll_interval_ms,
            rpc_url: lookup("CHAIN_RPC_URL").filter(|url| !url.trim().is_empty()),
        })
    }
}

/// Every instant the first cycle touches is representable: the primary window
/// and the trailing day snapshot, each with its seed window
fn first_cycle_fits(start: DateTime<Utc>, primary: StatType) -> bool {
    TimeRange::starting_at(start, primary)
        .and_then(|range| TimeRange::ending_at(range.end, StatType::Day))
        .and_then(|day| day.previous_start())
        .is_some()
}

fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(secs) = value.parse::<i64>() {
        return Utc.timestamp_opt(secs, 0).single();
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
