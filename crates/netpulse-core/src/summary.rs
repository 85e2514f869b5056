//! Display-ready summaries computed from the history store.
//!
//! Sparklines use windowed normalization: each call rescales against the
//! min/max of the samples currently in the window, so the same absolute
//! latency can map to a different glyph as the window moves.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::error;

use crate::endpoint::Endpoint;
use crate::history::HistoryStore;
use crate::sample::{FailureReason, Outcome, Sample, Throughput, ThroughputSample};

/// Glyph ramp from lowest to highest bucket
pub const SPARK_GLYPHS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Reserved glyph for failed samples. Never part of [`SPARK_GLYPHS`].
pub const FAILURE_GLYPH: char = '×';

/// Most recent state of an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Latest {
    NoData,
    Latency(Duration),
    Down(FailureReason),
}

impl Latest {
    pub fn is_down(&self) -> bool {
        matches!(self, Latest::Down(_))
    }
}

impl fmt::Display for Latest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Latest::NoData => write!(f, "waiting"),
            Latest::Latency(latency) => write!(f, "{:.1} ms", latency.as_secs_f64() * 1000.0),
            Latest::Down(reason) => write!(f, "down ({reason})"),
        }
    }
}

/// Aggregates over the visible window. Latency figures only consider
/// successful samples.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WindowStats {
    pub samples: usize,
    pub failures: usize,
    pub min_ms: Option<f64>,
    pub max_ms: Option<f64>,
    pub mean_ms: Option<f64>,
}

impl WindowStats {
    fn from_values(values: &[Option<f64>]) -> Self {
        let successes: Vec<f64> = values.iter().flatten().copied().collect();
        let (min_ms, max_ms) = bounds(&successes).map_or((None, None), |(lo, hi)| (Some(lo), Some(hi)));
        let mean_ms = (!successes.is_empty())
            .then(|| successes.iter().sum::<f64>() / successes.len() as f64);

        Self {
            samples: values.len(),
            failures: values.len() - successes.len(),
            min_ms,
            max_ms,
            mean_ms,
        }
    }

    /// Fraction of failed samples, 0.0 for an empty window
    pub fn loss_ratio(&self) -> f64 {
        if self.samples == 0 { 0.0 } else { self.failures as f64 / self.samples as f64 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub endpoint: Endpoint,
    pub latest: Latest,
    pub sparkline: String,
    pub window: WindowStats,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThroughputSummary {
    pub latest: Option<Throughput>,
    pub sparkline: String,
    pub samples: usize,
}

/// Renders a sequence of values as glyphs, oldest to newest. `None` entries
/// are failures and render as [`FAILURE_GLYPH`].
///
/// With fewer than two values, or when every value is equal, all values render
/// as the lowest glyph.
pub fn sparkline(values: &[Option<f64>]) -> String {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let scale = bounds(&present).filter(|(lo, hi)| present.len() >= 2 && hi > lo);
    let top = (SPARK_GLYPHS.len() - 1) as f64;

    values
        .iter()
        .map(|value| match (value, scale) {
            (None, _) => FAILURE_GLYPH,
            (Some(_), None) => SPARK_GLYPHS[0],
            (Some(v), Some((lo, hi))) => {
                let bucket = ((v - lo) * top / (hi - lo)).floor().clamp(0.0, top) as usize;
                SPARK_GLYPHS[bucket]
            }
        })
        .collect()
}

fn bounds(values: &[f64]) -> Option<(f64, f64)> {
    values.iter().copied().fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

/// Summarizes one endpoint's samples. Split out from [`Summarizer`] so it can
/// be applied to any snapshot.
pub fn summarize_samples(endpoint: &Endpoint, samples: &[Sample]) -> Summary {
    let values: Vec<Option<f64>> = samples.iter().map(|s| s.outcome.latency_ms()).collect();

    let latest = match samples.last().map(|s| s.outcome) {
        None => Latest::NoData,
        Some(Outcome::Success(latency)) => Latest::Latency(latency),
        Some(Outcome::Failure(reason)) => Latest::Down(reason),
    };

    Summary {
        endpoint: endpoint.clone(),
        latest,
        sparkline: sparkline(&values),
        window: WindowStats::from_values(&values),
    }
}

pub fn summarize_throughput_samples(samples: &[ThroughputSample]) -> ThroughputSummary {
    let values: Vec<Option<f64>> = samples.iter().map(|s| s.throughput.bytes_per_sec()).collect();
    ThroughputSummary {
        latest: samples.last().map(|s| s.throughput),
        sparkline: sparkline(&values),
        samples: samples.len(),
    }
}

/// Read-only view over the history store
#[derive(Clone)]
pub struct Summarizer {
    store: Arc<HistoryStore>,
}

impl Summarizer {
    pub fn new(store: Arc<HistoryStore>) -> Self {
        Self { store }
    }

    pub fn summarize(&self, endpoint: &Endpoint) -> Summary {
        let samples = self.store.snapshot(endpoint.id).unwrap_or_else(|e| {
            error!(endpoint = %endpoint, "Failed to snapshot history: {}", e);
            debug_assert!(false, "snapshot failed: {e}");
            Vec::new()
        });
        summarize_samples(endpoint, &samples)
    }

    /// Summaries in configuration order
    pub fn summarize_all(&self, endpoints: &[Endpoint]) -> Vec<Summary> {
        endpoints.iter().map(|endpoint| self.summarize(endpoint)).collect()
    }

    pub fn summarize_throughput(&self) -> ThroughputSummary {
        summarize_throughput_samples(&self.store.throughput_snapshot())
    }
}
