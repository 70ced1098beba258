//! Checkpoint arithmetic for one synchronization cycle.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::info;

use super::{ResyncError, WithContext};
use crate::checkpoint::{KubeClient, INITIAL_TIMESTAMP};

/// Timestamps a cycle consumes from and writes back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResyncTimestamps {
    /// Becomes the next consumption timestamp once the cycle succeeds.
    pub start_time: DateTime<Utc>,
    /// Events at or after this timestamp are fetched.
    pub last_consumed_tenant_timestamp: String,
    pub last_resync_timestamp: String,
    pub full_resync: bool,
}

/// Read the checkpoint and decide whether this cycle is a full resync.
///
/// A full resync consumes every event from the beginning and stamps `now`
/// as the new full resync time.
pub async fn resync_timestamps(
    client: &dyn KubeClient,
    full_resync_interval: Duration,
    now: DateTime<Utc>,
) -> Result<ResyncTimestamps, ResyncError> {
    let (last_consumed, last_resync) = client
        .get_tenant_fetcher_config_map_data()
        .await
        .context("while reading checkpoint")?;

    if should_full_resync(&last_resync, full_resync_interval, now)? {
        info!(interval = ?full_resync_interval, "Full resync interval elapsed, performing a full resync");
        return Ok(ResyncTimestamps {
            start_time: now,
            last_consumed_tenant_timestamp: INITIAL_TIMESTAMP.to_string(),
            last_resync_timestamp: convert_time_to_unix_millis(now),
            full_resync: true,
        });
    }

    Ok(ResyncTimestamps {
        start_time: now,
        last_consumed_tenant_timestamp: last_consumed,
        last_resync_timestamp: last_resync,
        full_resync: false,
    })
}

/// Whether `interval` has passed since `last_full_resync` (epoch milliseconds).
pub fn should_full_resync(
    last_full_resync: &str,
    interval: Duration,
    now: DateTime<Utc>,
) -> Result<bool, ResyncError> {
    let invalid = |reason: String| ResyncError::InvalidTimestamp {
        value: last_full_resync.to_string(),
        reason,
    };

    let millis: i64 = last_full_resync
        .trim()
        .parse()
        .map_err(|e: std::num::ParseIntError| invalid(e.to_string()))?;
    // Second precision
    let last = DateTime::<Utc>::from_timestamp(millis / 1000, 0)
        .ok_or_else(|| invalid("out of range".to_string()))?;
    let interval = TimeDelta::from_std(interval).map_err(|e| invalid(e.to_string()))?;

    match last.checked_add_signed(interval) {
        Some(due) => Ok(now > due),
        None => Ok(false),
    }
}

pub fn convert_time_to_unix_millis(time: DateTime<Utc>) -> String {
    time.timestamp_millis().to_string()
}
