//! Runtime settings for a monitor, validated once at startup.

use std::time::Duration;

use url::Url;

use crate::endpoint::{Endpoint, EndpointId, default_endpoints};
use crate::error::ConfigError;

pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(2);
pub const MIN_UPDATE_INTERVAL: Duration = Duration::from_millis(100);
pub const MAX_UPDATE_INTERVAL: Duration = Duration::from_secs(3600);
pub const MIN_RENDER_INTERVAL: Duration = Duration::from_millis(500);

pub const DEFAULT_PROBE_SIZE: usize = 30;
pub const MAX_PROBE_SIZE: usize = 1024;

pub const DEFAULT_MAX_CONCURRENCY: usize = 64;
pub const DEFAULT_ICMP_PAYLOAD_BYTES: usize = 56;
pub const DEFAULT_DNS_QUERY_NAME: &str = "example.com";
pub const DEFAULT_DOWNLOAD_BYTES: u64 = 256 * 1024;

/// Nameservers used for DNS probes against hostnames and for resolving
/// probe targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolverChoice {
    #[default]
    System,
    Cloudflare,
    Google,
}

/// Optional download throughput probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSettings {
    pub url: Url,
    pub bytes: u64,
}

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub endpoints: Vec<Endpoint>,

    /// Time between the starts of consecutive ticks
    pub update_interval: Duration,

    /// Per-probe deadline. Defaults to 80% of the update interval.
    pub probe_timeout: Option<Duration>,

    /// Defaults to `max(500ms, update_interval / 2)`
    pub render_interval: Option<Duration>,

    /// History width, the number of samples kept per endpoint
    pub probe_size: usize,

    pub max_concurrency: usize,
    pub icmp_payload_bytes: usize,
    pub dns_query_name: String,
    pub resolver: ResolverChoice,
    pub download: Option<DownloadSettings>,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            endpoints: default_endpoints(),
            update_interval: DEFAULT_UPDATE_INTERVAL,
            probe_timeout: None,
            render_interval: None,
            probe_size: DEFAULT_PROBE_SIZE,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            icmp_payload_bytes: DEFAULT_ICMP_PAYLOAD_BYTES,
            dns_query_name: DEFAULT_DNS_QUERY_NAME.into(),
            resolver: ResolverChoice::default(),
            download: None,
        }
    }
}

impl MonitorSettings {
    pub fn builder() -> MonitorSettingsBuilder {
        MonitorSettingsBuilder::default()
    }

    pub fn effective_probe_timeout(&self) -> Duration {
        self.probe_timeout.unwrap_or(self.update_interval * 4 / 5)
    }

    pub fn effective_render_interval(&self) -> Duration {
        self.render_interval.unwrap_or((self.update_interval / 2).max(MIN_RENDER_INTERVAL))
    }

    /// Rejects anything that would make the scheduler misbehave. Endpoint ids
    /// are reassigned to match list positions.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        if !(MIN_UPDATE_INTERVAL..=MAX_UPDATE_INTERVAL).contains(&self.update_interval) {
            return Err(ConfigError::InvalidInterval(self.update_interval));
        }

        let timeout = self.effective_probe_timeout();
        if timeout.is_zero() || timeout >= self.update_interval {
            return Err(ConfigError::InvalidTimeout { timeout, interval: self.update_interval });
        }

        if self.effective_render_interval().is_zero() {
            return Err(ConfigError::InvalidRenderInterval(self.effective_render_interval()));
        }

        if self.probe_size == 0 || self.probe_size > MAX_PROBE_SIZE {
            return Err(ConfigError::InvalidProbeSize(self.probe_size));
        }

        if self.max_concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency);
        }

        if self.endpoints.is_empty() {
            return Err(ConfigError::NoEndpoints);
        }

        for (i, endpoint) in self.endpoints.iter_mut().enumerate() {
            endpoint.id = EndpointId(i);
            endpoint.validate()?;
        }

        if let Some(download) = &self.download {
            match download.url.scheme() {
                "http" | "https" => {}
                other => {
                    return Err(ConfigError::InvalidUrl {
                        url: download.url.to_string(),
                        reason: format!("unsupported scheme '{other}'"),
                    });
                }
            }
            if download.bytes == 0 {
                return Err(ConfigError::InvalidUrl {
                    url: download.url.to_string(),
                    reason: "byte budget must be non-zero".into(),
                });
            }
        }

        Ok(self)
    }
}

/// Builder for MonitorSettings
#[derive(Default)]
pub struct MonitorSettingsBuilder {
    settings: MonitorSettings,
}

impl MonitorSettingsBuilder {
    /// Validate and build the settings
    pub fn build(self) -> Result<MonitorSettings, ConfigError> {
        self.settings.validate()
    }

    pub fn endpoints(mut self, endpoints: Vec<Endpoint>) -> Self {
        self.settings.endpoints = endpoints;
        self
    }

    pub fn update_interval(mut self, interval: Duration) -> Self {
        self.settings.update_interval = interval;
        self
    }

    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.settings.probe_timeout = Some(timeout);
        self
    }

    pub fn render_interval(mut self, interval: Duration) -> Self {
        self.settings.render_interval = Some(interval);
        self
    }

    pub fn probe_size(mut self, size: usize) -> Self {
        self.settings.probe_size = size;
        self
    }

    pub fn max_concurrency(mut self, limit: usize) -> Self {
        self.settings.max_concurrency = limit;
        self
    }

    pub fn icmp_payload_bytes(mut self, bytes: usize) -> Self {
        self.settings.icmp_payload_bytes = bytes;
        self
    }

    pub fn dns_query_name(mut self, name: impl Into<String>) -> Self {
        self.settings.dns_query_name = name.into();
        self
    }

    pub fn resolver(mut self, resolver: ResolverChoice) -> Self {
        self.settings.resolver = resolver;
        self
    }

    pub fn download(mut self, download: Option<DownloadSettings>) -> Self {
        self.settings.download = download;
        self
    }
}

/// Parses a download URL, reporting failures as configuration errors
pub fn parse_download_url(url: &str) -> Result<Url, ConfigError> {
    Url::parse(url).map_err(|e| ConfigError::InvalidUrl { url: url.into(), reason: e.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::ProbeKind;

    #[test]
    fn test_defaults_are_valid() {
        let settings = MonitorSettings::builder().build().unwrap();
        assert_eq!(settings.endpoints.len(), 3);
        assert_eq!(settings.probe_size, DEFAULT_PROBE_SIZE);
        assert_eq!(settings.effective_probe_timeout(), Duration::from_millis(1600));
        assert_eq!(settings.effective_render_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_render_interval_floor() {
        let settings = MonitorSettings::builder()
            .update_interval(Duration::from_millis(200))
            .build()
            .unwrap();
        assert_eq!(settings.effective_render_interval(), MIN_RENDER_INTERVAL);
    }

    #[test]
    fn test_explicit_render_interval() {
        let settings = MonitorSettings::builder()
            .render_interval(Duration::from_millis(250))
            .build()
            .unwrap();
        assert_eq!(settings.effective_render_interval(), Duration::from_millis(250));

        let result = MonitorSettings::builder().render_interval(Duration::ZERO).build();
        assert!(matches!(result, Err(ConfigError::InvalidRenderInterval(_))));
    }

    #[test]
    fn test_rejects_bad_intervals() {
        let result = MonitorSettings::builder().update_interval(Duration::from_millis(10)).build();
        assert!(matches!(result, Err(ConfigError::InvalidInterval(_))));

        let result = MonitorSettings::builder()
            .update_interval(Duration::from_secs(1))
            .probe_timeout(Duration::from_secs(1))
            .build();
        assert!(matches!(result, Err(ConfigError::InvalidTimeout { .. })));

        let result = MonitorSettings::builder().probe_timeout(Duration::ZERO).build();
        assert!(matches!(result, Err(ConfigError::InvalidTimeout { .. })));
    }

    #[test]
    fn test_rejects_bad_probe_size_and_endpoints() {
        let result = MonitorSettings::builder().probe_size(0).build();
        assert!(matches!(result, Err(ConfigError::InvalidProbeSize(0))));

        let result = MonitorSettings::builder().endpoints(Vec::new()).build();
        assert!(matches!(result, Err(ConfigError::NoEndpoints)));

        let bad = Endpoint::new(EndpointId(0), "", 80, ProbeKind::Tcp);
        let result = MonitorSettings::builder().endpoints(vec![bad]).build();
        assert!(matches!(result, Err(ConfigError::InvalidEndpoint { .. })));
    }

    #[test]
    fn test_reassigns_endpoint_ids() {
        let endpoints = vec![
            Endpoint::new(EndpointId(9), "a.example", 80, ProbeKind::Tcp),
            Endpoint::new(EndpointId(9), "b.example", 53, ProbeKind::Dns),
        ];
        let settings = MonitorSettings::builder().endpoints(endpoints).build().unwrap();
        assert_eq!(settings.endpoints[0].id, EndpointId(0));
        assert_eq!(settings.endpoints[1].id, EndpointId(1));
    }

    #[test]
    fn test_download_url_validation() {
        let url = parse_download_url("ftp://example.com/file").unwrap();
        let result = MonitorSettings::builder()
            .download(Some(DownloadSettings { url, bytes: 1024 }))
            .build();
        assert!(matches!(result, Err(ConfigError::InvalidUrl { .. })));

        assert!(parse_download_url("not a url").is_err());
    }
}
