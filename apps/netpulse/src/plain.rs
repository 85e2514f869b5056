use std::io::Write;

use anyhow::{Context, Result};
use chrono::Local;
use netpulse_core::{Frame, RenderSink};

use crate::format;

/// Line-oriented output, one block per refresh
pub struct PlainSink<W> {
    out: W,
}

impl<W: Write> PlainSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> RenderSink for PlainSink<W> {
    fn display(&mut self, frame: &Frame) -> Result<()> {
        let stamp = frame.at.with_timezone(&Local).format("%H:%M:%S");

        for summary in &frame.summaries {
            writeln!(
                self.out,
                "[{stamp}] {:<24} {:<5} {:>18}  {}",
                summary.endpoint.label(),
                summary.endpoint.kind.as_str(),
                summary.latest.to_string(),
                format::trend(summary, frame.history_width),
            )
            .context("Failed to write to stdout")?;
        }

        if let (Some(url), Some(throughput)) = (&frame.download_url, &frame.throughput) {
            writeln!(
                self.out,
                "[{stamp}] {}",
                format::download_line(url, throughput, frame.history_width)
            )
            .context("Failed to write to stdout")?;
        }

        self.out.flush().context("Failed to flush stdout")
    }
}
