//! External time sources
//!
//! The cursor never produces a window whose end is after `now()`. With a chain
//! RPC clock, "now" is the timestamp of the latest block, so stats never run
//! ahead of indexed data.

use super::error::StatError;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

#[async_trait]
pub trait TimeSource: Send + Sync {
    async fn now(&self) -> Result<DateTime<Utc>, StatError>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[async_trait]
impl TimeSource for SystemClock {
    async fn now(&self) -> Result<DateTime<Utc>, StatError> {
        Ok(Utc::now())
    }
}

/// Timestamp of the latest block from an Ethereum-style JSON-RPC node
pub struct RpcBlockClock {
    client: reqwest::Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<RpcBlock>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcBlock {
    timestamp: String,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

impl RpcBlockClock {
    pub fn new(url: impl Into<String>) -> Result<Self, StatError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| StatError::TimeSource(format!("Failed to build RPC client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

/// Decode a `0x`-prefixed quantity holding unix seconds
fn parse_block_timestamp(hex: &str) -> Result<DateTime<Utc>, StatError> {
    let digits = hex.strip_prefix("0x").unwrap_or(hex);
    let secs = i64::from_str_radix(digits, 16)
        .map_err(|e| StatError::TimeSource(format!("Bad block timestamp {:?}: {}", hex, e)))?;

    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| StatError::TimeSource(format!("Block timestamp out of range: {}", secs)))
}

#[async_trait]
impl TimeSource for RpcBlockClock {
    async fn now(&self) -> Result<DateTime<Utc>, StatError> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_getBlockByNumber",
            "params": ["latest", false],
        });

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| StatError::TimeSource(format!("RPC request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(StatError::TimeSource(format!(
                "RPC error: {}",
                response.status()
            )));
        }

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| StatError::TimeSource(format!("Bad RPC response: {}", e)))?;

        if let Some(err) = body.error {
            return Err(StatError::TimeSource(format!(
                "RPC error {}: {}",
                err.code, err.message
            )));
        }

        let block = body
            .result
            .ok_or_else(|| StatError::TimeSource("No latest block".to_string()))?;

        parse_block_timestamp(&block.timestamp)
    }
}
