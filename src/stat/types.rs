//! Core data types for address statistics
//!
//! - `StatType` - closed set of granularities and their durations
//! - `TimeRange` - ephemeral half-open window `[start, end)`
//! - `StatRecord` - one persisted row per `(stat_type, stat_time)`

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Granularity of a stat stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StatType {
    #[serde(rename = "10m")]
    TenMinutes,
    #[serde(rename = "1h")]
    Hour,
    #[serde(rename = "1d")]
    Day,
}

impl StatType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatType::TenMinutes => "10m",
            StatType::Hour => "1h",
            StatType::Day => "1d",
        }
    }

    pub fn duration_secs(&self) -> i64 {
        match self {
            StatType::TenMinutes => 10 * 60,
            StatType::Hour => 60 * 60,
            StatType::Day => 24 * 60 * 60,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::seconds(self.duration_secs())
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "10m" => Some(StatType::TenMinutes),
            "1h" => Some(StatType::Hour),
            "1d" => Some(StatType::Day),
            _ => None,
        }
    }

    pub fn all() -> [StatType; 3] {
        [StatType::TenMinutes, StatType::Hour, StatType::Day]
    }

    /// Round `t` down to the nearest boundary of this granularity (UTC, epoch-based)
    pub fn align_down(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        let secs = t.timestamp();
        let aligned = secs - secs.rem_euclid(self.duration_secs());
        Utc.timestamp_opt(aligned, 0).single().unwrap_or(t)
    }
}

impl std::fmt::Display for StatType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Half-open window `[start, end)` of one granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub interval_type: StatType,
}

impl TimeRange {
    /// Window of `interval_type` beginning at `start`
    ///
    /// `None` if the end falls outside the representable time range.
    pub fn starting_at(start: DateTime<Utc>, interval_type: StatType) -> Option<Self> {
        let end = start.checked_add_signed(interval_type.duration())?;
        Some(Self {
            start,
            end,
            interval_type,
        })
    }

    /// Window of `interval_type` finishing at `end`
    pub fn ending_at(end: DateTime<Utc>, interval_type: StatType) -> Option<Self> {
        let start = end.checked_sub_signed(interval_type.duration())?;
        Some(Self {
            start,
            end,
            interval_type,
        })
    }

    /// Start of the window of the same granularity immediately before this one
    pub fn previous_start(&self) -> Option<DateTime<Utc>> {
        self.start.checked_sub_signed(self.interval_type.duration())
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}, {})",
            self.interval_type,
            self.start.to_rfc3339(),
            self.end.to_rfc3339()
        )
    }
}

/// Address statistics for one window
///
/// `active` is reserved and always zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatRecord {
    pub stat_time: DateTime<Utc>,
    pub stat_type: StatType,
    pub count: u64,
    pub active: u64,
    pub total: u64,
}

impl StatRecord {
    pub fn key(&self) -> (StatType, DateTime<Utc>) {
        (self.stat_type, self.stat_time)
    }
}
