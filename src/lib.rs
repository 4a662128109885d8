pub mod config;
pub mod dto;
pub mod error;
pub mod metrics;
pub mod output;
pub mod poller;
pub mod session;
pub mod snapshot;
pub mod source;

pub use error::{Error, Result};
pub use metrics::collector::MetricsCollector;
pub use metrics::snapshot::MetricsSnapshot;
pub use poller::{PollerMode, PollerState, StatusPoller};
pub use snapshot::StatusSnapshot;
pub use source::{HttpStatusSource, StatusSource};
