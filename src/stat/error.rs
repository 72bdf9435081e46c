//! Error types for the stat pipeline

use super::types::StatType;
use chrono::{DateTime, Utc};

/// Failure reported by a backing store
#[derive(Debug)]
pub enum StoreError {
    Database(rusqlite::Error),
    Io(std::io::Error),
    /// A write collided with an existing `(stat_type, stat_time)` key
    Conflict(String),
    /// A stored row could not be decoded
    Malformed(String),
    Poisoned,
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(ref e, ref msg)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::Conflict(msg.clone().unwrap_or_else(|| e.to_string()))
            }
            other => StoreError::Database(other),
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err)
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Database(e) => write!(f, "Database error: {}", e),
            StoreError::Io(e) => write!(f, "IO error: {}", e),
            StoreError::Conflict(e) => write!(f, "Key conflict: {}", e),
            StoreError::Malformed(e) => write!(f, "Malformed row: {}", e),
            StoreError::Poisoned => write!(f, "Connection lock poisoned"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Database(e) => Some(e),
            StoreError::Io(e) => Some(e),
            _ => None,
        }
    }
}

/// Which of the three cascaded records an error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Snapshot {
    Primary,
    Hour,
    Day,
}

impl Snapshot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Snapshot::Primary => "primary",
            Snapshot::Hour => "hour",
            Snapshot::Day => "day",
        }
    }
}

/// Step of the persistence transaction that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistStep {
    Delete(Snapshot),
    Save,
}

impl std::fmt::Display for PersistStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersistStep::Delete(part) => write!(f, "failed to del {} stat", part.as_str()),
            PersistStep::Save => write!(f, "failed to save stats"),
        }
    }
}

#[derive(Debug)]
pub enum StatError {
    Store(StoreError),
    /// The previous-window lookup returned data that cannot seed a total
    InconsistentSeed {
        stat_type: StatType,
        stat_time: DateTime<Utc>,
        reason: String,
    },
    /// A window bound falls outside the representable time range
    OutOfRange {
        stat_type: StatType,
        at: DateTime<Utc>,
    },
    Snapshot {
        part: Snapshot,
        source: Box<StatError>,
    },
    Persist {
        step: PersistStep,
        source: StoreError,
    },
    TimeSource(String),
}

impl StatError {
    pub(crate) fn within(self, part: Snapshot) -> Self {
        StatError::Snapshot {
            part,
            source: Box::new(self),
        }
    }
}

impl From<StoreError> for StatError {
    fn from(err: StoreError) -> Self {
        StatError::Store(err)
    }
}

impl std::fmt::Display for StatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatError::Store(e) => write!(f, "Store error: {}", e),
            StatError::InconsistentSeed {
                stat_type,
                stat_time,
                reason,
            } => write!(
                f,
                "Inconsistent seed for {} at {}: {}",
                stat_type,
                stat_time.to_rfc3339(),
                reason
            ),
            StatError::OutOfRange { stat_type, at } => write!(
                f,
                "{} window next to {} is out of the representable time range",
                stat_type,
                at.to_rfc3339()
            ),
            StatError::Snapshot { part, source } => {
                write!(f, "failed to compute {} stat: {}", part.as_str(), source)
            }
            StatError::Persist { step, source } => write!(f, "{}: {}", step, source),
            StatError::TimeSource(e) => write!(f, "Time source error: {}", e),
        }
    }
}

impl std::error::Error for StatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StatError::Store(e) => Some(e),
            StatError::Snapshot { source, .. } => Some(source.as_ref()),
            StatError::Persist { source, .. } => Some(source),
            _ => None,
        }
    }
}
