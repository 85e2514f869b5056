mod cli;
mod config;
mod format;
mod plain;
mod tui;

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use netpulse_core::{Monitor, NetworkProbe, ThroughputProbe};
use tracing::{info, warn};

use cli::Cli;
use config::Config;
use plain::PlainSink;
use tui::TerminalSink;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init(cli.log_target()).context("Failed to initialize logging")?;

    let config = Config::from_config(cli.config.as_deref())
        .and_then(|config| config.with_overrides(&cli))
        .context("Failed to load configuration")?;
    let settings = config.clone().into_settings().context("Invalid configuration")?;
    if cli.print_config {
        print!("{config}");
        return Ok(());
    }

    info!(
        endpoints = settings.endpoints.len(),
        interval = ?settings.update_interval,
        history = settings.probe_size,
        "Starting NetPulse"
    );

    let executor = NetworkProbe::new(&settings).context("Failed to set up probes")?;
    let mut monitor = Monitor::new(&settings, Arc::new(executor));
    if let Some(download) = &settings.download {
        let probe = ThroughputProbe::new(download).context("Failed to set up download probe")?;
        let url = probe.url().to_string();
        monitor = monitor.with_throughput(url, Arc::new(probe));
    }

    let frame = if cli.plain {
        monitor.run(PlainSink::new(io::stdout()), interrupted()).await?
    } else {
        let mut sink = TerminalSink::enter()?;
        let quit = async {
            tokio::select! {
                _ = interrupted() => {}
                _ = tui::wait_for_quit() => {}
            }
        };
        let result = monitor.run(&mut sink, quit).await;
        sink.restore()?;
        result?
    };

    print!("{}", format::exit_summary(&frame));
    Ok(())
}

/// Resolves on Ctrl-C. Never resolves if the signal handler cannot be installed.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
