//! SQLite backend for address records and address stats
//!
//! Tables (see `sql/`):
//! - `addresses` - append-only, counted by `block_time`
//! - `address_stats` - UNIQUE(stat_type, stat_time)
//!
//! Instants are stored as unix seconds.

use super::error::{StatError, StoreError};
use super::store::{AddressStore, StatStore, StatTransaction};
use super::types::{StatRecord, StatType};
use crate::sqlite_pragma::apply_optimized_pragmas;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

const ADDRESSES_SCHEMA: &str = include_str!("../../sql/01_addresses.sql");
const ADDRESS_STATS_SCHEMA: &str = include_str!("../../sql/02_address_stats.sql");

const STAT_COLUMNS: &str = "stat_type, stat_time, addr_count, addr_active, addr_total";

/// Open `db_path` with tuned PRAGMAs and the schema applied
///
/// Creates the parent directory if needed. Schema statements use
/// `IF NOT EXISTS`, so this is safe on an existing database.
pub fn open_database(db_path: impl AsRef<Path>) -> Result<Connection, StoreError> {
    if let Some(parent) = db_path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to create database directory {}: {}", parent.display(), e),
                ))
            })?;
        }
    }

    let conn = Connection::open(db_path)?;
    apply_optimized_pragmas(&conn)?;
    apply_schema(&conn)?;
    Ok(conn)
}

pub fn apply_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(ADDRESSES_SCHEMA)?;
    conn.execute_batch(ADDRESS_STATS_SCHEMA)?;
    Ok(())
}

fn to_instant(secs: i64) -> Result<DateTime<Utc>, StoreError> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| StoreError::Malformed(format!("timestamp out of range: {}", secs)))
}

fn to_sql_counter(name: &str, value: u64) -> Result<i64, StoreError> {
    i64::try_from(value)
        .map_err(|_| StoreError::Malformed(format!("{} does not fit in INTEGER: {}", name, value)))
}

fn from_sql_counter(name: &str, value: i64) -> Result<u64, StoreError> {
    u64::try_from(value).map_err(|_| StoreError::Malformed(format!("negative {}: {}", name, value)))
}

/// Undecoded `address_stats` row
type RawStatRow = (String, i64, i64, i64, i64);

fn read_raw_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawStatRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn decode_row(raw: RawStatRow) -> Result<StatRecord, StoreError> {
    let (stat_type, stat_time, count, active, total) = raw;
    let stat_type = StatType::from_str(&stat_type)
        .ok_or_else(|| StoreError::Malformed(format!("unknown stat_type: {}", stat_type)))?;

    Ok(StatRecord {
        stat_time: to_instant(stat_time)?,
        stat_type,
        count: from_sql_counter("addr_count", count)?,
        active: from_sql_counter("addr_active", active)?,
        total: from_sql_counter("addr_total", total)?,
    })
}

/// `AddressStore` over the `addresses` table
pub struct SqliteAddressStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteAddressStore {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = open_database(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Append address records in one transaction
    ///
    /// Addresses already present are ignored, so replaying a block is harmless.
    /// Returns the number of rows actually inserted.
    pub fn insert_addresses(
        &self,
        addresses: &[(String, DateTime<Utc>)],
    ) -> Result<usize, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR IGNORE INTO addresses (address, block_time) VALUES (?1, ?2)",
            )?;
            for (address, block_time) in addresses {
                inserted += stmt.execute(params![address, block_time.timestamp()])?;
            }
        }
        tx.commit()?;

        log::debug!("✅ Appended {} of {} addresses", inserted, addresses.len());
        Ok(inserted)
    }
}

impl AddressStore for SqliteAddressStore {
    fn count(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<u64, StoreError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM addresses WHERE block_time >= ?1 AND block_time < ?2",
            params![start.timestamp(), end.timestamp()],
            |row| row.get(0),
        )?;
        from_sql_counter("address count", count)
    }
}

/// `StatStore` over the `address_stats` table
pub struct SqliteStatStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStatStore {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = open_database(db_path)?;
        log::info!("✅ Stat store initialized with WAL mode");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Records of `stat_type` with `from <= stat_time < to`, oldest first
    pub fn list_range(
        &self,
        stat_type: StatType,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<StatRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM address_stats
             WHERE stat_type = ?1 AND stat_time >= ?2 AND stat_time < ?3
             ORDER BY stat_time ASC",
            STAT_COLUMNS
        ))?;

        let rows = stmt.query_map(
            params![stat_type.as_str(), from.timestamp(), to.timestamp()],
            read_raw_row,
        )?;

        let mut records = Vec::new();
        for raw in rows {
            records.push(decode_row(raw?)?);
        }
        Ok(records)
    }
}

impl StatStore for SqliteStatStore {
    fn last_by_type(&self, stat_type: StatType) -> Result<Option<StatRecord>, StoreError> {
        let conn = self.lock()?;
        let raw = conn
            .query_row(
                &format!(
                    "SELECT {} FROM address_stats WHERE stat_type = ?1
                     ORDER BY stat_time DESC LIMIT 1",
                    STAT_COLUMNS
                ),
                params![stat_type.as_str()],
                read_raw_row,
            )
            .optional()?;

        raw.map(decode_row).transpose()
    }

    fn exists(
        &self,
        stat_type: StatType,
        stat_time: DateTime<Utc>,
    ) -> Result<Option<StatRecord>, StoreError> {
        let conn = self.lock()?;
        let raw = conn
            .query_row(
                &format!(
                    "SELECT {} FROM address_stats WHERE stat_type = ?1 AND stat_time = ?2",
                    STAT_COLUMNS
                ),
                params![stat_type.as_str(), stat_time.timestamp()],
                read_raw_row,
            )
            .optional()?;

        raw.map(decode_row).transpose()
    }

    fn run_in_transaction(
        &self,
        ops: &mut dyn FnMut(&mut dyn StatTransaction) -> Result<(), StatError>,
    ) -> Result<(), StatError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(StoreError::from)?;

        // Dropping `tx` without commit rolls back
        ops(&mut SqliteStatTx { conn: &tx })?;

        tx.commit().map_err(StoreError::from)?;
        Ok(())
    }
}

/// Writes issued against an open SQLite transaction
struct SqliteStatTx<'a> {
    conn: &'a Connection,
}

impl StatTransaction for SqliteStatTx<'_> {
    fn delete(&mut self, record: &StatRecord) -> Result<(), StoreError> {
        self.conn.execute(
            "DELETE FROM address_stats WHERE stat_type = ?1 AND stat_time = ?2",
            params![record.stat_type.as_str(), record.stat_time.timestamp()],
        )?;
        Ok(())
    }

    fn insert_all(&mut self, records: &[StatRecord]) -> Result<(), StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO address_stats
                (stat_type, stat_time, addr_count, addr_active, addr_total)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;

        for record in records {
            stmt.execute(params![
                record.stat_type.as_str(),
                record.stat_time.timestamp(),
                to_sql_counter("addr_count", record.count)?,
                to_sql_counter("addr_active", record.active)?,
                to_sql_counter("addr_total", record.total)?,
            ])?;
        }
        Ok(())
    }
}
