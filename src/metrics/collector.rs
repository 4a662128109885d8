use crate::metrics::snapshot::MetricsSnapshot;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Instant;

/// What caused a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchTrigger {
    Initial,
    Manual,
    LiveView,
}

#[derive(Clone)]
pub struct MetricsCollector {
    fetches_total: Arc<AtomicU64>,
    fetches_success: Arc<AtomicU64>,
    fetches_failed: Arc<AtomicU64>,
    initial_fetches: Arc<AtomicU64>,
    manual_refreshes: Arc<AtomicU64>,
    live_view_ticks: Arc<AtomicU64>,
    discarded_completions: Arc<AtomicU64>,
    total_fetch_time_ms: Arc<AtomicU64>,
    start_time: Arc<Instant>,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self {
            fetches_total: Arc::new(AtomicU64::new(0)),
            fetches_success: Arc::new(AtomicU64::new(0)),
            fetches_failed: Arc::new(AtomicU64::new(0)),
            initial_fetches: Arc::new(AtomicU64::new(0)),
            manual_refreshes: Arc::new(AtomicU64::new(0)),
            live_view_ticks: Arc::new(AtomicU64::new(0)),
            discarded_completions: Arc::new(AtomicU64::new(0)),
            total_fetch_time_ms: Arc::new(AtomicU64::new(0)),
            start_time: Arc::new(Instant::now()),
        }
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_fetch(&self, trigger: FetchTrigger, success: bool, duration_ms: u64) {
        self.fetches_total.fetch_add(1, Ordering::SeqCst);
        if success {
            self.fetches_success.fetch_add(1, Ordering::SeqCst);
        } else {
            self.fetches_failed.fetch_add(1, Ordering::SeqCst);
        }
        self.total_fetch_time_ms
            .fetch_add(duration_ms, Ordering::SeqCst);

        let counter = match trigger {
            FetchTrigger::Initial => &self.initial_fetches,
            FetchTrigger::Manual => &self.manual_refreshes,
            FetchTrigger::LiveView => &self.live_view_ticks,
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }

    /// A fetch completed after its session or subscription was gone.
    pub fn increment_discarded(&self) {
        self.discarded_completions.fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let total = self.fetches_total.load(Ordering::SeqCst);
        let success = self.fetches_success.load(Ordering::SeqCst);
        let total_time = self.total_fetch_time_ms.load(Ordering::SeqCst);

        let success_rate = if total > 0 {
            (success as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        let avg_fetch_time_ms = if total > 0 { total_time / total } else { 0 };

        MetricsSnapshot {
            fetches_total: total,
            fetches_success: success,
            fetches_failed: self.fetches_failed.load(Ordering::SeqCst),
            initial_fetches: self.initial_fetches.load(Ordering::SeqCst),
            manual_refreshes: self.manual_refreshes.load(Ordering::SeqCst),
            live_view_ticks: self.live_view_ticks.load(Ordering::SeqCst),
            discarded_completions: self.discarded_completions.load(Ordering::SeqCst),
            success_rate,
            avg_fetch_time_ms,
            elapsed_seconds: self.start_time.elapsed().as_secs_f64(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tallies_by_trigger_and_outcome() {
        let metrics = MetricsCollector::new();
        metrics.record_fetch(FetchTrigger::Initial, true, 40);
        metrics.record_fetch(FetchTrigger::Manual, false, 100);
        metrics.record_fetch(FetchTrigger::LiveView, true, 10);
        metrics.record_fetch(FetchTrigger::LiveView, true, 30);
        metrics.increment_discarded();

        let snap = metrics.snapshot();
        assert_eq!(snap.fetches_total, 4);
        assert_eq!(snap.fetches_failed, 1);
        assert_eq!(snap.initial_fetches, 1);
        assert_eq!(snap.manual_refreshes, 1);
        assert_eq!(snap.live_view_ticks, 2);
        assert_eq!(snap.discarded_completions, 1);
        assert_eq!(snap.avg_fetch_time_ms, 45);
        assert!((snap.success_rate - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn clones_share_counters() {
        let metrics = MetricsCollector::new();
        let other = metrics.clone();
        other.record_fetch(FetchTrigger::Manual, true, 5);
        assert_eq!(metrics.snapshot().manual_refreshes, 1);
        assert_eq!(MetricsCollector::new().snapshot().success_rate, 0.0);
    }
}
