//! Render sink seam between the engine and whatever draws the dashboard.

use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::summary::{Summary, ThroughputSummary};

/// Everything a renderer needs for one refresh
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub at: DateTime<Utc>,

    /// One row per endpoint, in configuration order
    pub summaries: Vec<Summary>,

    /// Present when a download probe is configured
    pub throughput: Option<ThroughputSummary>,
    pub download_url: Option<String>,

    pub update_interval: Duration,
    pub history_width: usize,
    pub ticks: u64,
}

impl Frame {
    pub fn down_count(&self) -> usize {
        self.summaries.iter().filter(|s| s.latest.is_down()).count()
    }
}

/// Consumes frames once per render cadence
pub trait RenderSink {
    fn display(&mut self, frame: &Frame) -> Result<()>;
}

impl<S: RenderSink + ?Sized> RenderSink for &mut S {
    fn display(&mut self, frame: &Frame) -> Result<()> {
        (**self).display(frame)
    }
}
