//! NetPulse engine
//!
//! Probes a set of endpoints at a fixed cadence, keeps a bounded latency
//! history per endpoint and turns it into display-ready summaries with
//! sparklines.

pub mod endpoint;
pub mod error;
pub mod history;
pub mod lifecycle;
pub mod probe;
pub mod sample;
pub mod scheduler;
pub mod settings;
pub mod sink;
pub mod summary;

// Re-export main types
pub use endpoint::{Endpoint, EndpointId, EndpointSpec, ProbeKind};
pub use error::{ConfigError, SchedulerError, StoreError};
pub use history::HistoryStore;
pub use lifecycle::Monitor;
pub use probe::{NetworkProbe, ProbeExecutor, ThroughputExecutor, ThroughputProbe};
pub use sample::{FailureReason, Outcome, Sample, Throughput};
pub use scheduler::{Scheduler, SchedulerState, Timing};
pub use settings::{DownloadSettings, MonitorSettings, ResolverChoice};
pub use sink::{Frame, RenderSink};
pub use summary::{Latest, Summarizer, Summary, ThroughputSummary, sparkline};

/// Re-export common error types
pub use anyhow;
