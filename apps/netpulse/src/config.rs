use std::time::Duration;
use std::{env, fmt, fs, path};

use netpulse_core::endpoint::{EndpointSpec, default_endpoints, parse_endpoint_list};
use netpulse_core::settings::{
    DEFAULT_DNS_QUERY_NAME, DEFAULT_DOWNLOAD_BYTES, DEFAULT_ICMP_PAYLOAD_BYTES,
    DEFAULT_MAX_CONCURRENCY, DEFAULT_PROBE_SIZE, DEFAULT_UPDATE_INTERVAL, parse_download_url,
};
use netpulse_core::{
    ConfigError, DownloadSettings, Endpoint, EndpointId, MonitorSettings, ProbeKind,
    ResolverChoice,
};
use serde::{Deserialize, Serialize};

use crate::cli::Cli;

/// On-disk configuration. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Seconds between probe rounds
    pub update_interval: f64,
    /// History width
    pub probe_size: usize,
    /// Seconds, defaults to 80% of the interval
    pub probe_timeout: Option<f64>,
    /// Seconds between redraws, defaults to half the interval
    pub render_interval: Option<f64>,
    pub max_concurrency: usize,
    pub icmp_payload_bytes: usize,
    pub dns_query_name: String,
    pub resolver: ResolverChoice,
    pub endpoints: Vec<EndpointEntry>,
    pub download: Option<DownloadEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointEntry {
    pub host: String,
    pub port: Option<u16>,
    #[serde(default = "default_kind")]
    pub kind: ProbeKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadEntry {
    pub url: String,
    #[serde(default = "default_download_bytes")]
    pub bytes: u64,
}

fn default_kind() -> ProbeKind {
    ProbeKind::Tcp
}

fn default_download_bytes() -> u64 {
    DEFAULT_DOWNLOAD_BYTES
}

impl From<&Endpoint> for EndpointEntry {
    fn from(endpoint: &Endpoint) -> Self {
        Self { host: endpoint.host.clone(), port: Some(endpoint.port), kind: endpoint.kind }
    }
}

impl EndpointEntry {
    fn to_endpoint(&self, id: EndpointId) -> Endpoint {
        let port = self.port.unwrap_or_else(|| self.kind.default_port());
        EndpointSpec { host: self.host.clone(), port, kind: self.kind }.into_endpoint(id)
    }
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/netpulse/config.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, ConfigError> {
    let path = if let Some(config_home) = env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(ConfigError::PathUnavailable);
    };

    Ok(path.join("netpulse/config.toml"))
}

fn seconds(value: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(value).ok()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            update_interval: DEFAULT_UPDATE_INTERVAL.as_secs_f64(),
            probe_size: DEFAULT_PROBE_SIZE,
            probe_timeout: None,
            render_interval: None,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            icmp_payload_bytes: DEFAULT_ICMP_PAYLOAD_BYTES,
            dns_query_name: DEFAULT_DNS_QUERY_NAME.into(),
            resolver: ResolverChoice::default(),
            endpoints: default_endpoints().iter().map(EndpointEntry::from).collect(),
            download: None,
        }
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);
        let write_2 = write_indented(2);

        writeln!(f, "Current Configuration:")?;
        write_title_1(f, "Probing")?;
        write_1(f, "Update Interval", &format!("{}s", self.update_interval))?;
        match self.probe_timeout {
            Some(timeout) => write_1(f, "Probe Timeout", &format!("{timeout}s"))?,
            None => write_1(f, "Probe Timeout", &"80% of interval")?,
        }
        match self.render_interval {
            Some(render) => write_1(f, "Render Interval", &format!("{render}s"))?,
            None => write_1(f, "Render Interval", &"half of interval")?,
        }
        write_1(f, "History Width", &self.probe_size)?;
        write_1(f, "Max Concurrency", &self.max_concurrency)?;
        write_1(f, "ICMP Payload", &format!("{} bytes", self.icmp_payload_bytes))?;
        write_1(f, "DNS Query Name", &self.dns_query_name)?;
        write_1(f, "Resolver", &format!("{:?}", self.resolver).to_lowercase())?;

        write_title_1(f, "Endpoints")?;
        for entry in &self.endpoints {
            let port = entry.port.unwrap_or_else(|| entry.kind.default_port());
            write_2(f, entry.kind.as_str(), &format!("{}:{}", entry.host, port))?;
        }

        if let Some(download) = &self.download {
            write_title_1(f, "Download")?;
            write_1(f, "URL", &download.url)?;
            write_1(f, "Bytes", &download.bytes)?;
        }

        Ok(())
    }
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Creates a default config in ~/.config/netpulse/config.toml
    ///  or the specified path if one does not exist
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, ConfigError> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path)
                .map_err(|source| ConfigError::Read { path: config_path.clone(), source })?;
            toml::from_str(raw_string.as_str())
                .map_err(|err| ConfigError::Parse { path: config_path, reason: err.to_string() })
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            tracing::info!(path = %config_path.display(), "Wrote default configuration");
            Ok(config)
        }
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &path::Path) -> Result<(), ConfigError> {
        let write_error = |reason: String| ConfigError::Write { path: path.to_path_buf(), reason };

        let config_str: String =
            toml::to_string_pretty(self).map_err(|err| write_error(err.to_string()))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| write_error(err.to_string()))?;
        }

        fs::write(path, config_str).map_err(|err| write_error(err.to_string()))
    }

    /// Applies command-line overrides. Values are checked later by
    /// [`Config::into_settings`].
    pub fn with_overrides(mut self, cli: &Cli) -> Result<Self, ConfigError> {
        if let Some(hosts) = &cli.hosts {
            self.endpoints = parse_endpoint_list(hosts)?.iter().map(EndpointEntry::from).collect();
        }
        if let Some(interval) = cli.interval {
            self.update_interval = interval;
        }
        if let Some(size) = cli.probe_size {
            self.probe_size = size;
        }
        if let Some(timeout) = cli.timeout {
            self.probe_timeout = Some(timeout);
        }
        if let Some(render) = cli.render_interval {
            self.render_interval = Some(render);
        }
        if let Some(url) = &cli.url {
            let bytes = cli
                .bytes
                .or(self.download.as_ref().map(|d| d.bytes))
                .unwrap_or(DEFAULT_DOWNLOAD_BYTES);
            self.download = Some(DownloadEntry { url: url.clone(), bytes });
        }
        Ok(self)
    }

    /// Validates the configuration into monitor settings
    pub fn into_settings(self) -> Result<MonitorSettings, ConfigError> {
        let endpoints = self
            .endpoints
            .iter()
            .enumerate()
            .map(|(i, entry)| entry.to_endpoint(EndpointId(i)))
            .collect();

        let update_interval =
            seconds(self.update_interval).ok_or(ConfigError::InvalidInterval(Duration::ZERO))?;

        let mut builder = MonitorSettings::builder()
            .endpoints(endpoints)
            .update_interval(update_interval)
            .probe_size(self.probe_size)
            .max_concurrency(self.max_concurrency)
            .icmp_payload_bytes(self.icmp_payload_bytes)
            .dns_query_name(self.dns_query_name)
            .resolver(self.resolver);

        if let Some(timeout_secs) = self.probe_timeout {
            let timeout = seconds(timeout_secs)
                .ok_or(ConfigError::InvalidTimeout { timeout: Duration::ZERO, interval: update_interval })?;
            builder = builder.probe_timeout(timeout);
        }

        if let Some(render_secs) = self.render_interval {
            let render =
                seconds(render_secs).ok_or(ConfigError::InvalidRenderInterval(Duration::ZERO))?;
            builder = builder.render_interval(render);
        }

        let download = self
            .download
            .map(|entry| {
                parse_download_url(&entry.url).map(|url| DownloadSettings { url, bytes: entry.bytes })
            })
            .transpose()?;

        builder.download(download).build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("netpulse").chain(args.iter().copied())).unwrap()
    }

    fn settings(args: &[&str]) -> Result<MonitorSettings, ConfigError> {
        Config::default().with_overrides(&cli(args))?.into_settings()
    }

    #[test]
    fn test_normalize_toml_path() {
        assert_eq!(normalize_toml_path(path::Path::new("a/netpulse")), path::PathBuf::from("a/netpulse.toml"));
        assert_eq!(normalize_toml_path(path::Path::new("a/b.toml")), path::PathBuf::from("a/b.toml"));
    }

    #[test]
    fn test_writes_default_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::from_config(Some(&path)).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());

        // Reading it back yields the same configuration
        assert_eq!(Config::from_config(Some(&path)).unwrap(), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
update_interval = 0.5
probe_size = 60

[[endpoints]]
host = "1.1.1.1"
kind = "dns"

[[endpoints]]
host = "example.com"
port = 443
kind = "https"
"#,
        )
        .unwrap();

        let config = Config::from_config(Some(&path)).unwrap();
        let settings = config.into_settings().unwrap();

        assert_eq!(settings.update_interval, Duration::from_millis(500));
        assert_eq!(settings.probe_size, 60);
        assert_eq!(settings.endpoints.len(), 2);
        assert_eq!(settings.endpoints[0].port, 53);
        assert_eq!(settings.endpoints[1].kind, ProbeKind::Https);
        assert_eq!(settings.endpoints[1].id, EndpointId(1));
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "probe_size = \"many\"").unwrap();

        let err = Config::from_config(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_cli_overrides_file() {
        let settings =
            settings(&["--hosts", "a.example:8080,icmp://b.example", "--interval", "5"]).unwrap();

        assert_eq!(settings.update_interval, Duration::from_secs(5));
        assert_eq!(settings.endpoints.len(), 2);
        assert_eq!(settings.endpoints[0].port, 8080);
        assert_eq!(settings.endpoints[1].kind, ProbeKind::Icmp);
    }

    #[test]
    fn test_download_from_cli() {
        let settings = settings(&["--url", "https://example.com/file.bin", "--bytes", "1024"]).unwrap();

        let download = settings.download.unwrap();
        assert_eq!(download.url.as_str(), "https://example.com/file.bin");
        assert_eq!(download.bytes, 1024);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(settings(&["--interval=-1"]), Err(ConfigError::InvalidInterval(_))));
        assert!(matches!(
            settings(&["--interval", "1", "--timeout", "2"]),
            Err(ConfigError::InvalidTimeout { .. })
        ));
        assert!(matches!(
            settings(&["--hosts", "example.com:http"]),
            Err(ConfigError::InvalidEndpoint { .. })
        ));
        assert!(matches!(
            settings(&["--render-interval", "0"]),
            Err(ConfigError::InvalidRenderInterval(_))
        ));
        assert!(matches!(
            settings(&["--render-interval=-0.5"]),
            Err(ConfigError::InvalidRenderInterval(_))
        ));
    }

    #[test]
    fn test_display_lists_endpoints() {
        let rendered = Config::default().to_string();
        assert!(rendered.contains("tcp: 8.8.8.8:53"));
        assert!(rendered.contains("History Width: 30"));
    }

    #[test]
    fn test_render_interval_from_file() {
        let config: Config = toml::from_str("render_interval = 0.25").unwrap();
        let settings = config.into_settings().unwrap();
        assert_eq!(settings.effective_render_interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_printed_config_reflects_overrides() {
        let config = Config::default()
            .with_overrides(&cli(&[
                "--hosts",
                "a.example:8080",
                "--interval",
                "5",
                "--render-interval",
                "0.5",
            ]))
            .unwrap();
        let rendered = config.to_string();

        assert!(rendered.contains("tcp: a.example:8080"));
        assert!(!rendered.contains("8.8.8.8"));
        assert!(rendered.contains("Update Interval: 5s"));
        assert!(rendered.contains("Render Interval: 0.5s"));
    }
}
