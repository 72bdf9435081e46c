//! Stat Runtime - address statistics rollups
//!
//! Opens the SQLite database, then repeatedly computes the next primary
//! address stat window (plus trailing hour/day snapshots) until CTRL+C.
//!
//! Usage:
//!   cargo run --release --bin stat_runtime
//!
//! Environment variables:
//!   ADDRSTAT_DB_PATH - SQLite database path (default: data/addrstat.db)
//!   ADDRESS_STAT_INTERVAL - Primary interval: 10m, 1h or 1d (default: 1d)
//!   ADDRESS_STAT_START_TIME - First window start, RFC 3339 or unix seconds (required)
//!   STAT_POLL_INTERVAL_MS - Idle poll interval (default: 10000)
//!   CHAIN_RPC_URL - JSON-RPC node used as clock (default: system clock)
//!   RUST_LOG - Logging level (default: info)

use addrstat::stat::{
    RpcBlockClock, SqliteAddressStore, SqliteStatStore, StatConfig, StatContext, StatRunner,
    SystemClock, TimeSource,
};
use dotenv::dotenv;
use log::{error, info};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = StatConfig::from_env()?;

    info!("🚀 Starting address stat runtime");
    info!("   ├─ Database: {}", config.db_path);
    info!("   ├─ Primary interval: {}", config.primary_interval);
    info!("   ├─ Start time: {}", config.start_time.to_rfc3339());
    info!("   ├─ Poll interval: {}ms", config.poll_interval_ms);
    info!(
        "   └─ Clock: {}",
        config.rpc_url.as_deref().unwrap_or("system")
    );

    let stats = Arc::new(SqliteStatStore::open(&config.db_path)?);
    let addresses = Arc::new(SqliteAddressStore::open(&config.db_path)?);
    let clock: Arc<dyn TimeSource> = match &config.rpc_url {
        Some(url) => Arc::new(RpcBlockClock::new(url.clone())?),
        None => Arc::new(SystemClock),
    };
    info!("✅ Database initialized");

    let ctx = Arc::new(StatContext::new(&config, stats, addresses, clock));
    let runner = StatRunner::new(ctx, Duration::from_millis(config.poll_interval_ms));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(async move { runner.run(shutdown_rx).await });

    info!("🔄 Press CTRL+C to shutdown gracefully");

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("⚠️  Received CTRL+C, finishing current cycle..."),
        Err(err) => error!("❌ Failed to listen for CTRL+C: {}", err),
    }

    // Runner checks the flag between cycles only
    let _ = shutdown_tx.send(true);
    if let Err(e) = handle.await {
        error!("❌ Runner task failed: {}", e);
    }

    info!("✅ Stat runtime stopped");
    Ok(())
}
