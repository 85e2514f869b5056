use std::net::SocketAddr;
use std::time::{Duration, Instant};

use tokio::net::TcpStream;

use super::{HostResolver, ProbeError, Prober};
use crate::endpoint::{Endpoint, ProbeKind};

/// Times a TCP handshake. Name resolution happens first and is not included
/// in the measured latency.
#[derive(Clone)]
pub struct TcpProber {
    resolver: HostResolver,
}

impl TcpProber {
    pub fn new(resolver: HostResolver) -> Self {
        Self { resolver }
    }

    pub(crate) async fn connect(&self, host: &str, port: u16) -> Result<Duration, ProbeError> {
        let ip = self.resolver.resolve(host).await?;
        let port = if port == 0 { ProbeKind::Tcp.default_port() } else { port };

        let start = Instant::now();
        TcpStream::connect(SocketAddr::new(ip, port)).await?;
        Ok(start.elapsed())
    }
}

#[async_trait::async_trait]
impl Prober for TcpProber {
    async fn measure(&self, endpoint: &Endpoint, _timeout: Duration) -> Result<Duration, ProbeError> {
        self.connect(&endpoint.host, endpoint.port).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::EndpointId;
    use crate::settings::ResolverChoice;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_tcp_connect_to_local_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let prober = TcpProber::new(HostResolver::new(ResolverChoice::Cloudflare));
        let endpoint = Endpoint::new(EndpointId(0), "127.0.0.1", port, ProbeKind::Tcp);

        let latency = prober.measure(&endpoint, Duration::from_secs(1)).await;
        assert!(latency.is_ok(), "connect failed: {:?}", latency.err());
    }

    #[tokio::test]
    async fn test_tcp_connect_refused_is_unreachable() {
        // Bind then drop to get a port with no listener
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let prober = TcpProber::new(HostResolver::new(ResolverChoice::Cloudflare));
        let endpoint = Endpoint::new(EndpointId(0), "127.0.0.1", port, ProbeKind::Tcp);

        let err = prober.measure(&endpoint, Duration::from_secs(1)).await.unwrap_err();
        assert_eq!(err.reason(), crate::sample::FailureReason::Unreachable);
    }
}
