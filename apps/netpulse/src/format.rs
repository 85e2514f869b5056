//! Text formatting shared by the dashboard, plain output and exit summary.

use std::fmt::Write;

use netpulse_core::summary::WindowStats;
use netpulse_core::{Frame, Summary, Throughput, ThroughputSummary};

pub fn mean(window: &WindowStats) -> String {
    window.mean_ms.map_or_else(|| "-".into(), |ms| format!("{ms:.1} ms"))
}

pub fn loss(window: &WindowStats) -> String {
    if window.samples == 0 {
        return "-".into();
    }
    format!("{:.0}%", window.loss_ratio() * 100.0)
}

/// Right-aligns the sparkline so the newest glyph stays in the same column
pub fn trend(summary: &Summary, width: usize) -> String {
    format!("{:>width$}", summary.sparkline)
}

pub fn rate(throughput: Option<&Throughput>) -> String {
    match throughput {
        None => "waiting".into(),
        Some(Throughput::Failed(reason)) => format!("failed ({reason})"),
        Some(measured) => measured
            .megabits_per_sec()
            .map_or_else(|| "-".into(), |mbps| format!("{mbps:.2} Mbps")),
    }
}

pub fn download_line(url: &str, summary: &ThroughputSummary, width: usize) -> String {
    format!(
        "download {url}  {}  {:>width$}",
        rate(summary.latest.as_ref()),
        summary.sparkline
    )
}

/// Printed after the terminal is restored
pub fn exit_summary(frame: &Frame) -> String {
    let mut out = String::new();
    let label_width = frame.summaries.iter().map(|s| s.endpoint.label().len()).max().unwrap_or(0);

    let _ = writeln!(out, "NetPulse summary after {} rounds", frame.ticks);
    for summary in &frame.summaries {
        let _ = writeln!(
            out,
            "  {:<label_width$}  {:<5}  last {:<20}  avg {:<10}  loss {}",
            summary.endpoint.label(),
            summary.endpoint.kind.as_str(),
            summary.latest.to_string(),
            mean(&summary.window),
            loss(&summary.window),
        );
    }
    if let (Some(url), Some(throughput)) = (&frame.download_url, &frame.throughput) {
        let _ = writeln!(out, "  download {url}  last {}", rate(throughput.latest.as_ref()));
    }
    out
}
