//! Fixed-cadence probe scheduler.
//!
//! Ticks follow a fixed wall-clock cadence: tick `k` starts at
//! `t0 + k * update_interval`, and a tick that overruns causes the missed
//! slots to be skipped rather than bunched up. Every tick probes all
//! endpoints concurrently and finishes within `probe_timeout`, which is
//! shorter than the interval.
//!
//! Outcomes of a tick are written to the history store in one pass after
//! every probe has reported, so a tick is either recorded for every endpoint
//! or, when shutdown interrupts it, for none.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval, timeout, timeout_at};
use tracing::{debug, error, info, warn};

use crate::endpoint::{Endpoint, EndpointId};
use crate::error::SchedulerError;
use crate::history::HistoryStore;
use crate::probe::{ProbeExecutor, ThroughputExecutor};
use crate::sample::{FailureReason, Outcome, Throughput};
use crate::settings::MonitorSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerState::Idle => write!(f, "idle"),
            SchedulerState::Running => write!(f, "running"),
            SchedulerState::Stopping => write!(f, "stopping"),
            SchedulerState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Timing parameters copied out of the settings
#[derive(Debug, Clone, Copy)]
pub struct Timing {
    pub update_interval: Duration,
    pub probe_timeout: Duration,
    pub max_concurrency: usize,
}

impl From<&MonitorSettings> for Timing {
    fn from(settings: &MonitorSettings) -> Self {
        Self {
            update_interval: settings.update_interval,
            probe_timeout: settings.effective_probe_timeout(),
            max_concurrency: settings.max_concurrency,
        }
    }
}

/// Drives the tick loop and owns its lifecycle. A stopped scheduler cannot be
/// restarted; build a new one instead.
pub struct Scheduler {
    endpoints: Arc<[Endpoint]>,
    executor: Arc<dyn ProbeExecutor>,
    throughput: Option<Arc<dyn ThroughputExecutor>>,
    store: Arc<HistoryStore>,
    timing: Timing,
    state: SchedulerState,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
    ticks: Arc<AtomicU64>,
}

impl Scheduler {
    pub fn new(
        endpoints: Arc<[Endpoint]>,
        executor: Arc<dyn ProbeExecutor>,
        store: Arc<HistoryStore>,
        timing: Timing,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            endpoints,
            executor,
            throughput: None,
            store,
            timing,
            state: SchedulerState::Idle,
            shutdown,
            task: None,
            ticks: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Also measure download throughput on every tick
    pub fn with_throughput(mut self, probe: Arc<dyn ThroughputExecutor>) -> Self {
        self.throughput = Some(probe);
        self
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Number of ticks whose outcomes have been recorded
    pub fn completed_ticks(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    /// Spawns the tick loop. The first tick starts immediately.
    pub fn start(&mut self) -> Result<(), SchedulerError> {
        if self.state != SchedulerState::Idle {
            return Err(SchedulerError::InvalidTransition { from: self.state, action: "start" });
        }

        let tick_loop = TickLoop {
            endpoints: Arc::clone(&self.endpoints),
            executor: Arc::clone(&self.executor),
            throughput: self.throughput.clone(),
            store: Arc::clone(&self.store),
            timing: self.timing,
            limiter: Semaphore::new(self.timing.max_concurrency),
            ticks: Arc::clone(&self.ticks),
            last_up: HashMap::new(),
        };

        info!(
            endpoints = self.endpoints.len(),
            interval = ?self.timing.update_interval,
            timeout = ?self.timing.probe_timeout,
            "Scheduler starting"
        );
        self.task = Some(tokio::spawn(tick_loop.run(self.shutdown.subscribe())));
        self.state = SchedulerState::Running;
        Ok(())
    }

    /// Stops the tick loop. An in-flight tick is abandoned and its outcomes
    /// are discarded. Returns within one update interval.
    pub async fn stop(&mut self) {
        match self.state {
            SchedulerState::Idle => {
                self.state = SchedulerState::Stopped;
                return;
            }
            SchedulerState::Stopping | SchedulerState::Stopped => return,
            SchedulerState::Running => {}
        }

        self.state = SchedulerState::Stopping;
        // Ignore errors if the loop already exited
        let _ = self.shutdown.send(true);

        if let Some(mut task) = self.task.take() {
            match timeout(self.timing.update_interval, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Scheduler task ended abnormally: {}", e),
                Err(_) => {
                    warn!(
                        "Scheduler did not stop within {:?}, aborting",
                        self.timing.update_interval
                    );
                    task.abort();
                }
            }
        }

        self.state = SchedulerState::Stopped;
        info!(ticks = self.completed_ticks(), "Scheduler stopped");
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// State owned by the spawned loop. The loop is the only writer to the store.
struct TickLoop {
    endpoints: Arc<[Endpoint]>,
    executor: Arc<dyn ProbeExecutor>,
    throughput: Option<Arc<dyn ThroughputExecutor>>,
    store: Arc<HistoryStore>,
    timing: Timing,
    limiter: Semaphore,
    ticks: Arc<AtomicU64>,
    last_up: HashMap<EndpointId, bool>,
}

impl TickLoop {
    async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut timer = interval(self.timing.update_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = timer.tick() => {}
            }

            let started = Instant::now();
            let collected = tokio::select! {
                biased;
                _ = shutdown.changed() => None,
                collected = self.collect(started + self.timing.probe_timeout) => Some(collected),
            };

            let Some((outcomes, throughput)) = collected else {
                info!("Shutdown requested mid-tick, abandoning in-flight probes");
                break;
            };
            self.ingest(outcomes, throughput, started);
        }
    }

    /// Probes every endpoint, and the download URL if configured, returning
    /// one outcome per endpoint no later than `deadline`.
    async fn collect(&self, deadline: Instant) -> (Vec<(EndpointId, Outcome)>, Option<Throughput>) {
        let probes = async {
            let mut tasks: FuturesUnordered<_> =
                self.endpoints.iter().map(|endpoint| self.probe_one(endpoint, deadline)).collect();

            let mut outcomes = Vec::with_capacity(self.endpoints.len());
            while let Some(result) = tasks.next().await {
                outcomes.push(result);
            }
            outcomes
        };

        let download = async {
            match &self.throughput {
                Some(probe) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    let measured = timeout_at(deadline, probe.measure(remaining)).await;
                    Some(measured.unwrap_or(Throughput::Failed(FailureReason::Timeout)))
                }
                None => None,
            }
        };

        tokio::join!(probes, download)
    }

    async fn probe_one(&self, endpoint: &Endpoint, deadline: Instant) -> (EndpointId, Outcome) {
        let attempt = async {
            let _permit = self.limiter.acquire().await.ok();
            let remaining = deadline.saturating_duration_since(Instant::now());
            self.executor.probe(endpoint, remaining).await
        };

        // Overdue probes are dropped here regardless of what the executor does
        let outcome = timeout_at(deadline, attempt)
            .await
            .unwrap_or(Outcome::Failure(FailureReason::Timeout));
        (endpoint.id, outcome)
    }

    /// Records a completed tick. No await points, so a tick is never
    /// partially recorded.
    fn ingest(
        &mut self,
        mut outcomes: Vec<(EndpointId, Outcome)>,
        throughput: Option<Throughput>,
        started: Instant,
    ) {
        debug_assert_eq!(outcomes.len(), self.endpoints.len(), "every endpoint reports once per tick");
        outcomes.sort_by_key(|(id, _)| *id);

        let mut failures = 0;
        for (id, outcome) in outcomes {
            if !outcome.is_success() {
                failures += 1;
            }
            if let Err(e) = self.store.record(id, outcome) {
                error!(endpoint = %id, "Failed to record outcome: {}", e);
                debug_assert!(false, "history store rejected a record: {e}");
            }
            self.track_transition(id, &outcome);
        }

        if let Some(throughput) = throughput {
            self.store.record_throughput(throughput);
        }

        let tick = self.ticks.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(
            tick,
            probes = self.endpoints.len(),
            failures,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Tick completed"
        );
    }

    fn track_transition(&mut self, id: EndpointId, outcome: &Outcome) {
        let up = outcome.is_success();
        let previous = self.last_up.insert(id, up);

        let Some(endpoint) = self.endpoints.get(id.0) else {
            return;
        };
        match (previous, outcome) {
            (Some(true) | None, Outcome::Failure(reason)) => {
                warn!(endpoint = %endpoint, %reason, "[CHANGE] endpoint is down");
            }
            (Some(false), Outcome::Success(latency)) => {
                info!(endpoint = %endpoint, latency_ms = latency.as_millis() as u64, "[CHANGE] endpoint recovered");
            }
            _ => {}
        }
    }
}
