//! Owns the scheduler and the render loop for one monitoring session.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info};

use crate::endpoint::Endpoint;
use crate::history::HistoryStore;
use crate::probe::{ProbeExecutor, ThroughputExecutor};
use crate::scheduler::{Scheduler, SchedulerState, Timing};
use crate::settings::MonitorSettings;
use crate::sink::{Frame, RenderSink};
use crate::summary::Summarizer;

pub struct Monitor {
    endpoints: Arc<[Endpoint]>,
    store: Arc<HistoryStore>,
    scheduler: Scheduler,
    summarizer: Summarizer,
    render_interval: Duration,
    download_url: Option<String>,
}

impl Monitor {
    /// Builds the store, scheduler and summarizer from validated settings.
    pub fn new(settings: &MonitorSettings, executor: Arc<dyn ProbeExecutor>) -> Self {
        let endpoints: Arc<[Endpoint]> = settings.endpoints.clone().into();
        let store = Arc::new(HistoryStore::new(settings.probe_size, &endpoints));
        let scheduler = Scheduler::new(
            Arc::clone(&endpoints),
            executor,
            Arc::clone(&store),
            Timing::from(settings),
        );

        Self {
            summarizer: Summarizer::new(Arc::clone(&store)),
            endpoints,
            store,
            scheduler,
            render_interval: settings.effective_render_interval(),
            download_url: None,
        }
    }

    /// Adds a download probe measured on every tick
    pub fn with_throughput(mut self, url: impl Into<String>, probe: Arc<dyn ThroughputExecutor>) -> Self {
        self.scheduler = self.scheduler.with_throughput(probe);
        self.download_url = Some(url.into());
        self
    }

    pub fn store(&self) -> &Arc<HistoryStore> {
        &self.store
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    /// Summaries of the current history
    pub fn frame(&self) -> Frame {
        Frame {
            at: Utc::now(),
            summaries: self.summarizer.summarize_all(&self.endpoints),
            throughput: self.download_url.as_ref().map(|_| self.summarizer.summarize_throughput()),
            download_url: self.download_url.clone(),
            update_interval: self.scheduler.timing().update_interval,
            history_width: self.store.capacity(),
            ticks: self.scheduler.completed_ticks(),
        }
    }

    /// Runs until `shutdown` resolves or the sink fails, then stops the
    /// scheduler and returns the final frame.
    pub async fn run<S, F>(mut self, mut sink: S, shutdown: F) -> Result<Frame>
    where
        S: RenderSink,
        F: Future<Output = ()>,
    {
        self.scheduler.start()?;

        let mut render = interval(self.render_interval);
        render.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        let outcome = loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break Ok(());
                }
                _ = render.tick() => {
                    if let Err(e) = sink.display(&self.frame()) {
                        error!("Render sink failed: {:#}", e);
                        break Err(e);
                    }
                }
            }
        };

        self.scheduler.stop().await;
        outcome.map(|()| self.frame())
    }
}
