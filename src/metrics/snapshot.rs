use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub fetches_total: u64,
    pub fetches_success: u64,
    pub fetches_failed: u64,
    pub initial_fetches: u64,
    pub manual_refreshes: u64,
    pub live_view_ticks: u64,
    pub discarded_completions: u64,
    pub success_rate: f64,
    pub avg_fetch_time_ms: u64,
    pub elapsed_seconds: f64,
}
