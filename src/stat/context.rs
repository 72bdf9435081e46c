//! Shared execution context for one stat family

use super::clock::TimeSource;
use super::config::StatConfig;
use super::store::{AddressStore, StatStore};
use super::types::StatType;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Configuration plus the store and clock handles the cursor and aggregator share
///
/// Built once by the caller and handed to `RangeCursor`, `CascadingAggregator`
/// and `StatRunner`. Holds no per-cycle state.
pub struct StatContext {
    pub primary_interval: StatType,
    pub start_time: DateTime<Utc>,
    pub stats: Arc<dyn StatStore>,
    pub addresses: Arc<dyn AddressStore>,
    pub clock: Arc<dyn TimeSource>,
}

impl StatContext {
    pub fn new(
        config: &StatConfig,
        stats: Arc<dyn StatStore>,
        addresses: Arc<dyn AddressStore>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            primary_interval: config.primary_interval,
            start_time: config.start_time,
            stats,
            addresses,
            clock,
        }
    }
}
