//! Per-window statistic computation

use super::context::StatContext;
use super::error::{StatError, StoreError};
use super::types::{StatRecord, StatType, TimeRange};
use chrono::{DateTime, Utc};

/// Compute the stat record for `range` without persisting it
///
/// `count` is the number of addresses created in `[start, end)`. The running
/// total is seeded from the record of the same granularity starting at
/// `start - duration`; a missing record seeds zero. Empty windows still yield a
/// record so the primary sequence stays gapless.
pub fn stat_for(ctx: &StatContext, range: &TimeRange) -> Result<StatRecord, StatError> {
    let count = ctx.addresses.count(range.start, range.end)?;

    let stat_time = range.previous_start().ok_or(StatError::OutOfRange {
        stat_type: range.interval_type,
        at: range.start,
    })?;
    let seed = seed_total(ctx, range.interval_type, stat_time)?;
    let total = seed.checked_add(count).ok_or_else(|| StatError::InconsistentSeed {
        stat_type: range.interval_type,
        stat_time,
        reason: format!("total overflows: {} + {}", seed, count),
    })?;

    Ok(StatRecord {
        stat_time: range.start,
        stat_type: range.interval_type,
        count,
        active: 0,
        total,
    })
}

fn seed_total(
    ctx: &StatContext,
    stat_type: StatType,
    stat_time: DateTime<Utc>,
) -> Result<u64, StatError> {
    let previous = match ctx.stats.exists(stat_type, stat_time) {
        Ok(previous) => previous,
        Err(StoreError::Malformed(reason)) => {
            return Err(StatError::InconsistentSeed {
                stat_type,
                stat_time,
                reason,
            })
        }
        Err(e) => {
            log::error!("❌ Failed to query previous {} stat: {}", stat_type, e);
            return Err(e.into());
        }
    };

    match previous {
        None => Ok(0),
        Some(record) if record.key() != (stat_type, stat_time) => {
            Err(StatError::InconsistentSeed {
                stat_type,
                stat_time,
                reason: format!(
                    "lookup returned {} at {}",
                    record.stat_type,
                    record.stat_time.to_rfc3339()
                ),
            })
        }
        Some(record) if record.count > record.total => Err(StatError::InconsistentSeed {
            stat_type,
            stat_time,
            reason: format!("count {} exceeds total {}", record.count, record.total),
        }),
        Some(record) => Ok(record.total),
    }
}
