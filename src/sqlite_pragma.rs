//! Shared SQLite connection tuning

use rusqlite::Connection;

/// Apply the PRAGMAs every connection in this crate runs with
///
/// - WAL journal so the cursor can read while a cycle writes
/// - NORMAL sync (durable at checkpoint under WAL)
/// - in-memory temp store, 256MB mmap, ~64MB page cache
/// - autocheckpoint every 1000 pages
/// - 5s busy timeout for readers on a second connection
pub fn apply_optimized_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "temp_store", "MEMORY")?;
    conn.pragma_update(None, "mmap_size", 268_435_456i64)?;
    conn.pragma_update(None, "cache_size", -64_000i64)?;
    conn.pragma_update(None, "wal_autocheckpoint", 1000i64)?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    Ok(())
}
