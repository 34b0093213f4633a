//! Server clock offset for signed requests.
//!
//! Binance rejects signed requests whose timestamp drifts too far from
//! the exchange clock. The offset is estimated from one round trip,
//! halving the measured latency, and refreshed on every connectivity
//! probe.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::EngineError;

#[derive(Deserialize)]
struct ServerTimeResponse {
    #[serde(rename = "serverTime")]
    server_time: i64,
}

pub struct TimeSync {
    offset_ms: AtomicI64,
}

impl TimeSync {
    pub fn new() -> Self {
        Self {
            offset_ms: AtomicI64::new(0),
        }
    }

    /// Fetch the exchange clock, update the local offset, and return the
    /// server time. Doubles as the connectivity probe.
    pub async fn sync(&self, client: &Client, base_url: &str) -> Result<i64, EngineError> {
        let url = format!("{base_url}/fapi/v1/time");

        let local_before = local_ms();
        let response: ServerTimeResponse = client.get(&url).send().await?.json().await?;
        let local_after = local_ms();

        let round_trip = local_after - local_before;
        let estimated_local = local_before + round_trip / 2;
        let offset = response.server_time - estimated_local;
        self.offset_ms.store(offset, Ordering::Relaxed);

        debug!(offset_ms = offset, round_trip_ms = round_trip, "clock sync");
        Ok(response.server_time)
    }

    /// Current Unix timestamp in milliseconds, server-adjusted.
    pub fn timestamp_ms(&self) -> i64 {
        local_ms() + self.offset_ms.load(Ordering::Relaxed)
    }
}

impl Default for TimeSync {
    fn default() -> Self {
        Self::new()
    }
}

fn local_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsynced_timestamp_tracks_local_clock() {
        let sync = TimeSync::new();
        let before = local_ms();
        let ts = sync.timestamp_ms();
        let after = local_ms();
        assert!(ts >= before && ts <= after);
    }
}
