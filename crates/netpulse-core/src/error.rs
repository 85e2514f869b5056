//! Error types for the NetPulse engine.
//!
//! Only [`ConfigError`] is meant to reach the operator. Probe failures are
//! converted into [`crate::Outcome`] values and never surface as errors.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::endpoint::EndpointId;
use crate::scheduler::SchedulerState;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid update interval {0:?}: must be between {min:?} and {max:?}", min = crate::settings::MIN_UPDATE_INTERVAL, max = crate::settings::MAX_UPDATE_INTERVAL)]
    InvalidInterval(Duration),

    #[error("Invalid probe timeout {timeout:?}: must be non-zero and shorter than the update interval {interval:?}")]
    InvalidTimeout { timeout: Duration, interval: Duration },

    #[error("Invalid render interval {0:?}: must be non-zero")]
    InvalidRenderInterval(Duration),

    #[error("Invalid probe size {0}: must be between 1 and {max}", max = crate::settings::MAX_PROBE_SIZE)]
    InvalidProbeSize(usize),

    #[error("Invalid concurrency limit: must be at least 1")]
    InvalidConcurrency,

    #[error("No endpoints configured")]
    NoEndpoints,

    #[error("Invalid endpoint '{descriptor}': {reason}")]
    InvalidEndpoint { descriptor: String, reason: String },

    #[error("Invalid download URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Failed to write config {path}: {reason}")]
    Write { path: PathBuf, reason: String },

    #[error("No config directory available (neither XDG_CONFIG_HOME nor HOME is set)")]
    PathUnavailable,
}

impl ConfigError {
    pub(crate) fn endpoint(descriptor: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEndpoint { descriptor: descriptor.into(), reason: reason.into() }
    }
}

/// Violations of the history store's invariants. These indicate a programming
/// defect and are never expected at runtime.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("No history exists for endpoint {0}")]
    UnknownEndpoint(EndpointId),

    #[error("History lock for endpoint {0} was poisoned")]
    Poisoned(EndpointId),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Cannot {action} a scheduler in state {from}")]
    InvalidTransition { from: SchedulerState, action: &'static str },
}
