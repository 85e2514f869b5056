use std::time::Duration;

use anyhow::Result;
use tokio::time::{Instant, timeout_at};
use tracing::trace;
use url::Url;

use super::{ProbeError, ThroughputExecutor};
use super::http::USER_AGENT;
use crate::sample::Throughput;
use crate::settings::DownloadSettings;

/// Estimates download throughput by reading up to a byte budget from a URL.
///
/// The read stops at the deadline. Whatever arrived by then still counts, so
/// a slow link reports a low rate instead of a timeout.
pub struct ThroughputProbe {
    client: reqwest::Client,
    url: Url,
    budget: u64,
}

impl ThroughputProbe {
    pub fn new(settings: &DownloadSettings) -> Result<Self> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { client, url: settings.url.clone(), budget: settings.bytes })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn download(&self, deadline: Instant) -> Result<Throughput, ProbeError> {
        let mut response = timeout_at(deadline, self.client.get(self.url.clone()).send())
            .await
            .map_err(|_| ProbeError::Timeout)??;

        if !response.status().is_success() {
            return Err(ProbeError::Status(response.status().as_u16()));
        }

        let start = Instant::now();
        let mut read: u64 = 0;
        while read < self.budget {
            match timeout_at(deadline, response.chunk()).await {
                Ok(Ok(Some(chunk))) => read += (chunk.len() as u64).min(self.budget - read),
                Ok(Ok(None)) => break,
                Ok(Err(e)) if read == 0 => return Err(e.into()),
                Ok(Err(_)) => break,
                Err(_) if read == 0 => return Err(ProbeError::Timeout),
                Err(_) => break,
            }
        }

        if read == 0 {
            return Err(ProbeError::EmptyBody);
        }
        Ok(Throughput::Measured { bytes: read, elapsed: start.elapsed() })
    }
}

#[async_trait::async_trait]
impl ThroughputExecutor for ThroughputProbe {
    async fn measure(&self, limit: Duration) -> Throughput {
        let deadline = Instant::now() + limit;
        match self.download(deadline).await {
            Ok(throughput) => throughput,
            Err(e) => {
                trace!(url = %self.url, error = %e, "Download probe failed");
                Throughput::Failed(e.reason())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::FailureReason;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answers a single request with `content_length` in the header and
    /// `body` on the wire, then holds the connection open for `hold`.
    async fn serve_once(content_length: usize, body: Vec<u8>, hold: Duration) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    return;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let head = format!("HTTP/1.1 200 OK\r\nContent-Length: {content_length}\r\n\r\n");
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(&body).await.unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(hold).await;
        });

        Url::parse(&format!("http://{addr}/file.bin")).unwrap()
    }

    fn probe(url: Url, budget: u64) -> ThroughputProbe {
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        ThroughputProbe { client, url, budget }
    }

    #[tokio::test]
    async fn test_full_body_is_measured() {
        let url = serve_once(512, vec![7; 512], Duration::ZERO).await;

        let result = probe(url, 1024).measure(Duration::from_secs(5)).await;
        assert!(
            matches!(result, Throughput::Measured { bytes: 512, .. }),
            "unexpected result: {result:?}"
        );
    }

    #[tokio::test]
    async fn test_read_stops_at_budget() {
        let url = serve_once(4096, vec![7; 4096], Duration::ZERO).await;

        let result = probe(url, 1000).measure(Duration::from_secs(5)).await;
        assert!(
            matches!(result, Throughput::Measured { bytes: 1000, .. }),
            "unexpected result: {result:?}"
        );
    }

    #[tokio::test]
    async fn test_empty_body_is_unreachable() {
        let url = serve_once(0, Vec::new(), Duration::ZERO).await;

        let result = probe(url, 1024).measure(Duration::from_secs(5)).await;
        assert_eq!(result, Throughput::Failed(FailureReason::Unreachable));
    }

    #[tokio::test]
    async fn test_stalled_body_keeps_partial_count() {
        // Promises 1000 bytes, sends 100, then goes quiet past the deadline
        let url = serve_once(1000, vec![7; 100], Duration::from_secs(5)).await;

        let result = probe(url, 1000).measure(Duration::from_millis(500)).await;
        assert!(
            matches!(result, Throughput::Measured { bytes: 100, .. }),
            "unexpected result: {result:?}"
        );
    }
}
