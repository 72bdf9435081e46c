//! Cascading aggregator: primary window plus trailing hour/day snapshots
//!
//! For each primary window the aggregator computes three records:
//!
//! ```text
//! primary  [start, end)           (contiguous stream)
//! hour     [end - 1h, end)        (sliding snapshot)
//! day      [end - 24h, end)       (sliding snapshot)
//! ```
//!
//! and persists them in one transaction. Snapshot keys depend only on `end`,
//! so a retried window produces the same keys; the existing hour/day rows are
//! deleted before the insert to keep one row per key. The primary key is
//! fresh by construction of the cursor and is never deleted.

use super::compute::stat_for;
use super::context::StatContext;
use super::error::{PersistStep, Snapshot, StatError};
use super::store::StatTransaction;
use super::types::{StatRecord, StatType, TimeRange};
use std::sync::Arc;

const SNAPSHOTS: [(Snapshot, StatType); 2] = [
    (Snapshot::Hour, StatType::Hour),
    (Snapshot::Day, StatType::Day),
];

pub struct CascadingAggregator {
    ctx: Arc<StatContext>,
}

impl CascadingAggregator {
    pub fn new(ctx: Arc<StatContext>) -> Self {
        Self { ctx }
    }

    /// Compute and persist the records for one primary window
    ///
    /// Returns the records written, primary first. Nothing is written if any
    /// step fails.
    pub fn compute(&self, range: &TimeRange) -> Result<Vec<StatRecord>, StatError> {
        let primary = stat_for(&self.ctx, range).map_err(|e| e.within(Snapshot::Primary))?;

        let mut snapshots = Vec::with_capacity(SNAPSHOTS.len());
        for (part, stat_type) in SNAPSHOTS {
            // Same granularity as the primary stream: the primary record is this snapshot
            if stat_type == range.interval_type {
                continue;
            }
            let window = TimeRange::ending_at(range.end, stat_type).ok_or_else(|| {
                StatError::OutOfRange {
                    stat_type,
                    at: range.end,
                }
                .within(part)
            })?;
            let record = stat_for(&self.ctx, &window).map_err(|e| e.within(part))?;
            snapshots.push((part, record));
        }

        let mut records = Vec::with_capacity(1 + snapshots.len());
        records.push(primary);
        records.extend(snapshots.iter().map(|(_, record)| record.clone()));

        self.ctx
            .stats
            .run_in_transaction(&mut |tx: &mut dyn StatTransaction| {
                for (part, record) in &snapshots {
                    tx.delete(record).map_err(|source| StatError::Persist {
                        step: PersistStep::Delete(*part),
                        source,
                    })?;
                }
                tx.insert_all(&records).map_err(|source| StatError::Persist {
                    step: PersistStep::Save,
                    source,
                })?;
                Ok(())
            })?;

        log::debug!(
            "✅ Saved {} stats for {} (count: {}, total: {})",
            records.len(),
            range,
            records[0].count,
            records[0].total
        );

        Ok(records)
    }
}
