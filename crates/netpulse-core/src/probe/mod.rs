//! Probe executors.
//!
//! A probe performs one network operation against an endpoint and reports the
//! elapsed time. Failures come back as [`Outcome::Failure`] values. The caller
//! never sees an error and a probe never runs past its timeout.

mod dns;
mod http;
mod icmp;
mod resolve;
mod tcp;
mod throughput;

use std::net::IpAddr;
use std::time::Duration;

use anyhow::Result;
use thiserror::Error;
use tokio::time::timeout;
use tracing::trace;

use crate::endpoint::{Endpoint, ProbeKind};
use crate::sample::{FailureReason, Outcome, Throughput};
use crate::settings::MonitorSettings;

pub use dns::DnsProber;
pub use http::HttpProber;
pub use icmp::IcmpProber;
pub use resolve::HostResolver;
pub use tcp::TcpProber;
pub use throughput::ThroughputProbe;

/// Performs a single latency probe. Implementations must return within
/// `timeout` and report every failure as a value.
#[async_trait::async_trait]
pub trait ProbeExecutor: Send + Sync {
    async fn probe(&self, endpoint: &Endpoint, timeout: Duration) -> Outcome;
}

/// Measures download throughput once. Implementations must return within
/// `timeout`.
#[async_trait::async_trait]
pub trait ThroughputExecutor: Send + Sync {
    async fn measure(&self, timeout: Duration) -> Throughput;
}

/// Kind-specific measurement. Errors are converted to a [`FailureReason`] by
/// the executor.
#[async_trait::async_trait]
pub trait Prober: Send + Sync {
    async fn measure(&self, endpoint: &Endpoint, timeout: Duration) -> Result<Duration, ProbeError>;
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Probe timed out")]
    Timeout,

    #[error("Name resolution failed: {0}")]
    Resolution(String),

    #[error("Connection failed: {0}")]
    Connect(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP check failed with status code: {0}")]
    Status(u16),

    #[error("ICMP echo failed: {0}")]
    Icmp(#[from] surge_ping::SurgeError),

    #[error("Response body was empty")]
    EmptyBody,
}

impl ProbeError {
    pub fn reason(&self) -> FailureReason {
        match self {
            ProbeError::Timeout => FailureReason::Timeout,
            ProbeError::Resolution(_) => FailureReason::Resolution,
            ProbeError::Connect(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                FailureReason::Timeout
            }
            ProbeError::Http(e) if e.is_timeout() => FailureReason::Timeout,
            ProbeError::Icmp(surge_ping::SurgeError::Timeout { .. }) => FailureReason::Timeout,
            ProbeError::Connect(_)
            | ProbeError::Http(_)
            | ProbeError::Status(_)
            | ProbeError::Icmp(_)
            | ProbeError::EmptyBody => FailureReason::Unreachable,
        }
    }
}

/// Production executor that dispatches on the endpoint's probe kind
pub struct NetworkProbe {
    tcp: TcpProber,
    dns: DnsProber,
    http: HttpProber,
    icmp: IcmpProber,
}

impl NetworkProbe {
    pub fn new(settings: &MonitorSettings) -> Result<Self> {
        let resolver = HostResolver::new(settings.resolver);
        let tcp = TcpProber::new(resolver.clone());

        Ok(Self {
            dns: DnsProber::new(&settings.endpoints, settings.resolver, &settings.dns_query_name)?,
            http: HttpProber::new()?,
            icmp: IcmpProber::new(resolver, tcp.clone(), settings.icmp_payload_bytes),
            tcp,
        })
    }

    fn prober(&self, kind: ProbeKind) -> &dyn Prober {
        match kind {
            ProbeKind::Tcp => &self.tcp,
            ProbeKind::Dns => &self.dns,
            ProbeKind::Http | ProbeKind::Https => &self.http,
            ProbeKind::Icmp => &self.icmp,
        }
    }
}

#[async_trait::async_trait]
impl ProbeExecutor for NetworkProbe {
    async fn probe(&self, endpoint: &Endpoint, limit: Duration) -> Outcome {
        let measurement = timeout(limit, self.prober(endpoint.kind).measure(endpoint, limit)).await;

        match measurement {
            Ok(Ok(latency)) => Outcome::Success(latency),
            Ok(Err(e)) => {
                trace!(endpoint = %endpoint, error = %e, "Probe failed");
                Outcome::Failure(e.reason())
            }
            Err(_) => Outcome::Failure(FailureReason::Timeout),
        }
    }
}

/// Returns the literal address when `host` is already an IP
pub(crate) fn literal_ip(host: &str) -> Option<IpAddr> {
    host.trim_start_matches('[').trim_end_matches(']').parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_reasons() {
        assert_eq!(ProbeError::Timeout.reason(), FailureReason::Timeout);
        assert_eq!(ProbeError::Resolution("nx".into()).reason(), FailureReason::Resolution);
        assert_eq!(ProbeError::Status(503).reason(), FailureReason::Unreachable);
        assert_eq!(ProbeError::EmptyBody.reason(), FailureReason::Unreachable);

        let refused = std::io::Error::from(std::io::ErrorKind::ConnectionRefused);
        assert_eq!(ProbeError::Connect(refused).reason(), FailureReason::Unreachable);

        let timed_out = std::io::Error::from(std::io::ErrorKind::TimedOut);
        assert_eq!(ProbeError::Connect(timed_out).reason(), FailureReason::Timeout);
    }

    #[test]
    fn test_literal_ip() {
        assert!(literal_ip("1.1.1.1").is_some());
        assert!(literal_ip("[::1]").is_some());
        assert!(literal_ip("example.com").is_none());
    }
}
