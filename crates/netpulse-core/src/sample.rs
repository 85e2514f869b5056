use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a probe did not produce a latency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    Timeout,
    Unreachable,
    Resolution,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Timeout => write!(f, "timeout"),
            FailureReason::Unreachable => write!(f, "unreachable"),
            FailureReason::Resolution => write!(f, "resolution error"),
        }
    }
}

/// Result of a single probe attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success(Duration),
    Failure(FailureReason),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn latency(&self) -> Option<Duration> {
        match self {
            Outcome::Success(latency) => Some(*latency),
            Outcome::Failure(_) => None,
        }
    }

    /// Latency in fractional milliseconds, `None` for failures
    pub fn latency_ms(&self) -> Option<f64> {
        self.latency().map(|d| d.as_nanos() as f64 / 1_000_000.0)
    }
}

/// One recorded probe outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub at: DateTime<Utc>,
    pub outcome: Outcome,
}

impl Sample {
    pub fn new(at: DateTime<Utc>, outcome: Outcome) -> Self {
        Self { at, outcome }
    }
}

/// Result of one download throughput probe
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Throughput {
    /// Bytes read and the time it took to read them
    Measured { bytes: u64, elapsed: Duration },
    Failed(FailureReason),
}

impl Throughput {
    pub fn bytes_per_sec(&self) -> Option<f64> {
        match self {
            Throughput::Measured { bytes, elapsed } => {
                let secs = elapsed.as_secs_f64().max(0.0001);
                Some(*bytes as f64 / secs)
            }
            Throughput::Failed(_) => None,
        }
    }

    pub fn megabits_per_sec(&self) -> Option<f64> {
        self.bytes_per_sec().map(|bps| bps * 8.0 / 1_000_000.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThroughputSample {
    pub at: DateTime<Utc>,
    pub throughput: Throughput,
}
