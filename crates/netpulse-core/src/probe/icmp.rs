use std::net::IpAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use surge_ping::{Client, Config, ICMP, PingIdentifier, PingSequence};
use tracing::{info, warn};

use super::{HostResolver, ProbeError, Prober, TcpProber};
use crate::endpoint::Endpoint;

/// Sends one ICMP echo per probe.
///
/// Raw ICMP sockets usually need elevated privileges. When a socket cannot be
/// opened for an address family, endpoints of that family are measured with a
/// TCP connect on their configured port instead.
pub struct IcmpProber {
    v4: Option<Client>,
    v6: Option<Client>,
    resolver: HostResolver,
    fallback: TcpProber,
    payload: Vec<u8>,
    sequence: AtomicU16,
}

impl IcmpProber {
    /// Opens the ICMP sockets. Must run inside a Tokio runtime.
    pub fn new(resolver: HostResolver, fallback: TcpProber, payload_bytes: usize) -> Self {
        let v4 = open_client(Config::default());
        let v6 = open_client(Config::builder().kind(ICMP::V6).build());

        if v4.is_none() && v6.is_none() {
            warn!("ICMP sockets unavailable (insufficient privileges?); ICMP endpoints fall back to TCP connect");
        } else {
            info!(v4 = v4.is_some(), v6 = v6.is_some(), "ICMP client ready");
        }

        Self {
            v4,
            v6,
            resolver,
            fallback,
            payload: vec![0u8; payload_bytes],
            sequence: AtomicU16::new(0),
        }
    }

    fn client_for(&self, ip: IpAddr) -> Option<&Client> {
        match ip {
            IpAddr::V4(_) => self.v4.as_ref(),
            IpAddr::V6(_) => self.v6.as_ref(),
        }
    }
}

fn open_client(config: Config) -> Option<Client> {
    Client::new(&config)
        .inspect_err(|e| warn!("Failed to create ICMP client: {}", e))
        .ok()
}

#[async_trait::async_trait]
impl Prober for IcmpProber {
    async fn measure(&self, endpoint: &Endpoint, timeout: Duration) -> Result<Duration, ProbeError> {
        let ip = self.resolver.resolve(&endpoint.host).await?;

        let Some(client) = self.client_for(ip) else {
            return self.fallback.connect(&ip.to_string(), endpoint.port).await;
        };

        let mut pinger = client.pinger(ip, PingIdentifier(rand::random())).await;
        pinger.timeout(timeout);

        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let (_packet, latency) = pinger.ping(PingSequence(seq), &self.payload).await?;
        Ok(latency)
    }
}
