//! Shared fixtures for unit tests

use super::clock::TimeSource;
use super::context::StatContext;
use super::error::{StatError, StoreError};
use super::sqlite_store::{SqliteAddressStore, SqliteStatStore};
use super::store::{StatStore, StatTransaction};
use super::types::{StatRecord, StatType};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Midnight UTC of day `n` after the epoch
pub fn day(n: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(n * 86_400, 0).unwrap()
}

/// Clock whose "now" is set by the test
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }
}

#[async_trait]
impl TimeSource for ManualClock {
    async fn now(&self) -> Result<DateTime<Utc>, StatError> {
        Ok(*self.now.lock().unwrap())
    }
}

fn unavailable() -> StoreError {
    StoreError::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        "stat store unavailable",
    ))
}

/// Store calls that `FaultyStatStore` fails
#[derive(Debug, Clone, Copy, Default)]
pub struct Faults {
    pub last_by_type: bool,
    /// Fail `exists` lookups of this type
    pub exists: Option<StatType>,
    /// Answer `exists` lookups of this type with a record under another key
    pub wrong_key: Option<StatType>,
    /// Fail `delete` of records of this type
    pub delete: Option<StatType>,
}

/// SQLite stat store with injected failures
pub struct FaultyStatStore {
    inner: Arc<SqliteStatStore>,
    faults: Faults,
}

struct FaultyTx<'a> {
    inner: &'a mut dyn StatTransaction,
    faults: Faults,
}

impl StatTransaction for FaultyTx<'_> {
    fn delete(&mut self, record: &StatRecord) -> Result<(), StoreError> {
        if self.faults.delete == Some(record.stat_type) {
            return Err(unavailable());
        }
        self.inner.delete(record)
    }

    fn insert_all(&mut self, records: &[StatRecord]) -> Result<(), StoreError> {
        self.inner.insert_all(records)
    }
}

impl StatStore for FaultyStatStore {
    fn last_by_type(&self, stat_type: StatType) -> Result<Option<StatRecord>, StoreError> {
        if self.faults.last_by_type {
            return Err(unavailable());
        }
        self.inner.last_by_type(stat_type)
    }

    fn exists(
        &self,
        stat_type: StatType,
        stat_time: DateTime<Utc>,
    ) -> Result<Option<StatRecord>, StoreError> {
        if self.faults.exists == Some(stat_type) {
            return Err(unavailable());
        }
        if self.faults.wrong_key == Some(stat_type) {
            return Ok(Some(StatRecord {
                stat_time: stat_time + Duration::seconds(1),
                stat_type,
                count: 0,
                active: 0,
                total: 1,
            }));
        }
        self.inner.exists(stat_type, stat_time)
    }

    fn run_in_transaction(
        &self,
        ops: &mut dyn FnMut(&mut dyn StatTransaction) -> Result<(), StatError>,
    ) -> Result<(), StatError> {
        let faults = self.faults;
        self.inner
            .run_in_transaction(&mut |tx: &mut dyn StatTransaction| {
                ops(&mut FaultyTx { inner: tx, faults })
            })
    }
}

/// Temp SQLite database wired into a `StatContext`
pub struct TestEnv {
    _dir: TempDir,
    pub stats: Arc<SqliteStatStore>,
    pub addresses: Arc<SqliteAddressStore>,
    pub clock: Arc<ManualClock>,
    pub ctx: Arc<StatContext>,
}

impl TestEnv {
    pub fn new(primary: StatType, start: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self::build(primary, start, now, None)
    }

    /// Like `new`, but the context sees the stat store through `faults`.
    /// `stats` and `stat()` still reach the database directly.
    pub fn with_faults(
        primary: StatType,
        start: DateTime<Utc>,
        now: DateTime<Utc>,
        faults: Faults,
    ) -> Self {
        Self::build(primary, start, now, Some(faults))
    }

    fn build(
        primary: StatType,
        start: DateTime<Utc>,
        now: DateTime<Utc>,
        faults: Option<Faults>,
    ) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("stats.db");

        let stats = Arc::new(SqliteStatStore::open(&db_path).unwrap());
        let addresses = Arc::new(SqliteAddressStore::open(&db_path).unwrap());
        let clock = Arc::new(ManualClock::new(now));
        let ctx_stats: Arc<dyn StatStore> = match faults {
            Some(faults) => Arc::new(FaultyStatStore {
                inner: stats.clone(),
                faults,
            }),
            None => stats.clone(),
        };

        let ctx = Arc::new(StatContext {
            primary_interval: primary,
            start_time: start,
            stats: ctx_stats,
            addresses: addresses.clone(),
            clock: clock.clone(),
        });

        Self {
            _dir: dir,
            stats,
            addresses,
            clock,
            ctx,
        }
    }

    /// Append `n` fresh addresses at `at` plus an offset of a few seconds each
    pub fn add_addresses(&self, n: usize, at: DateTime<Utc>) {
        let batch: Vec<(String, DateTime<Utc>)> = (0..n)
            .map(|i| {
                (
                    format!("0x{:x}_{:040x}", at.timestamp(), i),
                    at + Duration::seconds(i as i64 % 60),
                )
            })
            .collect();
        self.addresses.insert_addresses(&batch).unwrap();
    }

    pub fn seed_stats(&self, records: Vec<StatRecord>) {
        self.stats
            .run_in_transaction(&mut |tx: &mut dyn StatTransaction| {
                tx.insert_all(&records)?;
                Ok(())
            })
            .unwrap();
    }

    /// Every stored stat row, in key order
    pub fn all_stats(&self) -> Vec<StatRecord> {
        let mut records = Vec::new();
        for stat_type in StatType::all() {
            records.extend(
                self.stats
                    .list_range(stat_type, DateTime::<Utc>::MIN_UTC, DateTime::<Utc>::MAX_UTC)
                    .unwrap(),
            );
        }
        records
    }

    pub fn stat(&self, stat_type: StatType, stat_time: DateTime<Utc>) -> Option<StatRecord> {
        self.stats.exists(stat_type, stat_time).unwrap()
    }
}
