//! Storage traits the stat core depends on
//!
//! The core never talks to SQLite directly. It sees:
//! - `AddressStore` - range counts over append-only address records
//! - `StatStore` - lookups plus an all-or-nothing transaction
//! - `StatTransaction` - the writes allowed inside that transaction

use super::error::{StatError, StoreError};
use super::types::{StatRecord, StatType};
use chrono::{DateTime, Utc};

/// Source of address records
pub trait AddressStore: Send + Sync {
    /// Number of address records created in `[start, end)`
    fn count(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<u64, StoreError>;
}

/// Writes available inside `StatStore::run_in_transaction`
pub trait StatTransaction {
    /// Remove the row sharing `record`'s `(stat_type, stat_time)` key, if any
    fn delete(&mut self, record: &StatRecord) -> Result<(), StoreError>;

    fn insert_all(&mut self, records: &[StatRecord]) -> Result<(), StoreError>;
}

/// Persisted stat records
pub trait StatStore: Send + Sync {
    /// Record of `stat_type` with the greatest `stat_time`
    fn last_by_type(&self, stat_type: StatType) -> Result<Option<StatRecord>, StoreError>;

    /// Record stored under exactly `(stat_type, stat_time)`
    fn exists(
        &self,
        stat_type: StatType,
        stat_time: DateTime<Utc>,
    ) -> Result<Option<StatRecord>, StoreError>;

    /// Run `ops` in one transaction: commit if it returns `Ok`, roll back otherwise
    fn run_in_transaction(
        &self,
        ops: &mut dyn FnMut(&mut dyn StatTransaction) -> Result<(), StatError>,
    ) -> Result<(), StatError>;
}
