use std::time::{Duration, Instant};

use anyhow::Result;

use super::{ProbeError, Prober};
use crate::endpoint::{Endpoint, ProbeKind};

pub(crate) const USER_AGENT: &str = concat!("NetPulse/", env!("CARGO_PKG_VERSION"));

/// Times an HTTP(S) GET up to the response headers. Redirects are not
/// followed; a 3xx counts as a response.
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self { client })
    }

    fn url(endpoint: &Endpoint) -> String {
        let scheme = if endpoint.kind == ProbeKind::Https { "https" } else { "http" };
        format!("{}://{}/", scheme, endpoint.label())
    }
}

#[async_trait::async_trait]
impl Prober for HttpProber {
    async fn measure(&self, endpoint: &Endpoint, timeout: Duration) -> Result<Duration, ProbeError> {
        let start = Instant::now();
        let response = self.client.get(Self::url(endpoint)).timeout(timeout).send().await?;
        let latency = start.elapsed();

        // Consider 2xx and 3xx as success
        let status = response.status();
        if status.is_success() || status.is_redirection() {
            Ok(latency)
        } else {
            Err(ProbeError::Status(status.as_u16()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::EndpointId;

    #[test]
    fn test_url_from_endpoint() {
        let https = Endpoint::new(EndpointId(0), "example.com", 443, ProbeKind::Https);
        assert_eq!(HttpProber::url(&https), "https://example.com:443/");

        let http = Endpoint::new(EndpointId(1), "::1", 8080, ProbeKind::Http);
        assert_eq!(HttpProber::url(&http), "http://[::1]:8080/");
    }
}
