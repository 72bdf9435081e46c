//! # Address Statistics
//!
//! Incrementally rolls append-only address records up into time-bucketed
//! stats: a contiguous primary stream (10m, 1h or 1d) plus trailing hour and
//! day snapshots taken at the end of every primary window.
//!
//! ## Architecture
//!
//! ```text
//! StatRunner (poll loop, cooperative shutdown)
//!     ↓
//! RangeCursor: last persisted stat + interval, bounded by TimeSource::now()
//!     ↓
//! CascadingAggregator: primary + hour + day via stat_for()
//!     ↓
//! StatStore::run_in_transaction: delete hour/day, insert all three
//! ```
//!
//! Every cycle re-derives its seed total from the store, so a crashed cycle
//! leaves nothing to reconstruct: the cursor simply returns the same window.
//!
//! ## Module Organization
//!
//! - `types` - StatType, TimeRange, StatRecord
//! - `error` - StoreError, StatError
//! - `store` - storage traits
//! - `sqlite_store` - SQLite implementation of the storage traits
//! - `clock` - external time sources
//! - `config` - environment configuration
//! - `context` - shared execution context
//! - `compute` - per-window stat computation
//! - `cursor` - next-window discovery
//! - `aggregator` - cascading compute and persist
//! - `runner` - poll loop

pub mod aggregator;
pub mod clock;
pub mod compute;
pub mod config;
pub mod context;
pub mod cursor;
pub mod error;
pub mod runner;
pub mod sqlite_store;
pub mod store;
pub mod types;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use aggregator::CascadingAggregator;
pub use clock::{RpcBlockClock, SystemClock, TimeSource};
pub use compute::stat_for;
pub use config::{ConfigError, StatConfig};
pub use context::StatContext;
pub use cursor::RangeCursor;
pub use error::{PersistStep, Snapshot, StatError, StoreError};
pub use runner::StatRunner;
pub use sqlite_store::{SqliteAddressStore, SqliteStatStore};
pub use store::{AddressStore, StatStore, StatTransaction};
pub use types::{StatRecord, StatType, TimeRange};
