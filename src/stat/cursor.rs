//! Range cursor: finds the next unprocessed window of a stat stream

use super::context::StatContext;
use super::error::StatError;
use super::types::{StatType, TimeRange};
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub struct RangeCursor {
    ctx: Arc<StatContext>,
}

impl RangeCursor {
    pub fn new(ctx: Arc<StatContext>) -> Self {
        Self { ctx }
    }

    /// Next window of `stat_type` to compute
    ///
    /// Resumes right after the latest persisted record of `stat_type`, or at the
    /// configured start time when there is none. Returns `Ok(None)` while the
    /// window would still end after the external clock's "now".
    pub async fn next_range(&self, stat_type: StatType) -> Result<Option<TimeRange>, StatError> {
        let start = match self.ctx.stats.last_by_type(stat_type)? {
            Some(last) => last
                .stat_time
                .checked_add_signed(stat_type.duration())
                .ok_or_else(|| StatError::InconsistentSeed {
                    stat_type,
                    stat_time: last.stat_time,
                    reason: "no window follows the last stored record".to_string(),
                })?,
            None => self.ctx.start_time,
        };

        let now = self.ctx.clock.now().await?;
        bounded_range(start, stat_type, now)
    }
}

/// Window of `stat_type` starting at `start`, unless it has not fully elapsed by `now`
pub(crate) fn bounded_range(
    start: DateTime<Utc>,
    stat_type: StatType,
    now: DateTime<Utc>,
) -> Result<Option<TimeRange>, StatError> {
    let range = TimeRange::starting_at(start, stat_type)
        .ok_or(StatError::OutOfRange { stat_type, at: start })?;
    if range.end > now {
        log::debug!(
            "⏳ No new {} window yet (end {} > now {})",
            stat_type,
            range.end.to_rfc3339(),
            now.to_rfc3339()
        );
        return Ok(None);
    }
    Ok(Some(range))
}
