use std::path::PathBuf;

use clap::Parser;
use logger::LogTarget;

/// Terminal network latency monitor
#[derive(Parser, Debug, Default)]
#[command(name = "netpulse", version)]
pub struct Cli {
    /// Comma-separated endpoints, `[kind://]host[:port]`. Kind is one of
    /// tcp, dns, http, https, icmp and defaults to tcp.
    #[arg(long, value_name = "HOSTS")]
    pub hosts: Option<String>,

    /// URL for the download throughput probe
    #[arg(long)]
    pub url: Option<String>,

    /// Bytes to read per download probe
    #[arg(long, requires = "url")]
    pub bytes: Option<u64>,

    /// Seconds between probe rounds
    #[arg(long, value_name = "SECONDS")]
    pub interval: Option<f64>,

    /// Number of samples kept per endpoint
    #[arg(long)]
    pub probe_size: Option<usize>,

    /// Per-probe timeout in seconds, shorter than the interval
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<f64>,

    /// Seconds between screen redraws, defaults to half the interval
    #[arg(long, value_name = "SECONDS")]
    pub render_interval: Option<f64>,

    /// Config file, defaults to $XDG_CONFIG_HOME/netpulse/config.toml
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Print plain lines instead of the dashboard
    #[arg(long)]
    pub plain: bool,

    /// Log file. Plain mode logs to stderr unless this is set.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long)]
    pub print_config: bool,
}

impl Cli {
    /// The dashboard owns the terminal, so its logs always go to a file
    pub fn log_target(&self) -> LogTarget {
        match (&self.log_file, self.plain) {
            (Some(path), _) => LogTarget::File(path.clone()),
            (None, true) => LogTarget::Stderr,
            (None, false) => logger::default_log_path().map_or(LogTarget::Disabled, LogTarget::File),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from([
            "netpulse",
            "--hosts",
            "8.8.8.8:53,dns://1.1.1.1",
            "--interval",
            "0.5",
            "--probe-size",
            "60",
            "--plain",
        ])
        .unwrap();

        assert_eq!(cli.hosts.as_deref(), Some("8.8.8.8:53,dns://1.1.1.1"));
        assert_eq!(cli.interval, Some(0.5));
        assert_eq!(cli.probe_size, Some(60));
        assert!(cli.plain);
        assert_eq!(cli.log_target(), LogTarget::Stderr);
    }

    #[test]
    fn test_bytes_requires_url() {
        assert!(Cli::try_parse_from(["netpulse", "--bytes", "1024"]).is_err());
        assert!(
            Cli::try_parse_from(["netpulse", "--url", "http://example.com/f", "--bytes", "1024"])
                .is_ok()
        );
    }

    #[test]
    fn test_explicit_log_file_wins() {
        let cli = Cli::try_parse_from(["netpulse", "--log-file", "/tmp/np.log"]).unwrap();
        assert_eq!(cli.log_target(), LogTarget::File("/tmp/np.log".into()));
    }
}
