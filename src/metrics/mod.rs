pub mod collector;
pub mod snapshot;

pub use collector::{FetchTrigger, MetricsCollector};
pub use snapshot::MetricsSnapshot;
