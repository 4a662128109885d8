use crate::dto::ServerInfo;
use crate::source::StatusSource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;

/// Outcome of one fetch against the status source.
///
/// A `None` payload means the fetch failed; presentation renders it as
/// "unavailable".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub payload: Option<Value>,
    pub duration_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl StatusSnapshot {
    pub fn new(payload: Option<Value>, duration_ms: u64) -> Self {
        Self {
            payload,
            duration_ms,
            timestamp: Utc::now(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.payload.is_some()
    }

    /// Interprets the payload as backend server info, if it has that shape.
    pub fn server_info(&self) -> Option<ServerInfo> {
        self.payload
            .as_ref()
            .and_then(|p| serde_json::from_value(p.clone()).ok())
    }
}

/// Elapsed time rounded to whole milliseconds.
pub fn round_millis(elapsed: Duration) -> u64 {
    (elapsed.as_secs_f64() * 1000.0).round() as u64
}

/// Calls the source once and turns the result into a snapshot.
///
/// Failures are logged and absorbed: the snapshot carries a `None`
/// payload and the time spent until the failure.
pub async fn measure_fetch(source: &dyn StatusSource) -> StatusSnapshot {
    let start = Instant::now();
    let result = source.fetch_status().await;
    let duration_ms = round_millis(start.elapsed());

    match result {
        Ok(payload) => StatusSnapshot::new(Some(payload), duration_ms),
        Err(e) => {
            log::warn!("Failed to fetch status after {}ms: {}", duration_ms, e);
            StatusSnapshot::new(None, duration_ms)
        }
    }
}
