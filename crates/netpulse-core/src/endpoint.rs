//! Monitored endpoints and the `host:port` descriptor syntax.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Position of an endpoint in the configured list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointId(pub usize);

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Network operation used to measure an endpoint's latency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    Tcp,
    Dns,
    Http,
    Https,
    Icmp,
}

impl ProbeKind {
    /// Port used when a descriptor does not name one
    pub fn default_port(self) -> u16 {
        match self {
            ProbeKind::Tcp | ProbeKind::Http => 80,
            ProbeKind::Https => 443,
            ProbeKind::Dns => 53,
            ProbeKind::Icmp => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProbeKind::Tcp => "tcp",
            ProbeKind::Dns => "dns",
            ProbeKind::Http => "http",
            ProbeKind::Https => "https",
            ProbeKind::Icmp => "icmp",
        }
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProbeKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(ProbeKind::Tcp),
            "dns" => Ok(ProbeKind::Dns),
            "http" => Ok(ProbeKind::Http),
            "https" => Ok(ProbeKind::Https),
            "icmp" | "ping" => Ok(ProbeKind::Icmp),
            other => Err(ConfigError::endpoint(s, format!("unknown probe kind '{other}'"))),
        }
    }
}

/// A monitored target. Immutable once the configuration is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub id: EndpointId,
    pub host: String,
    pub port: u16,
    pub kind: ProbeKind,
}

impl Endpoint {
    pub fn new(id: EndpointId, host: impl Into<String>, port: u16, kind: ProbeKind) -> Self {
        Self { id, host: host.into(), port, kind }
    }

    /// `host:port` label shown to the operator. IPv6 hosts are bracketed and
    /// ICMP endpoints, which have no port, show the bare host.
    pub fn label(&self) -> String {
        if self.kind == ProbeKind::Icmp {
            return self.host.clone();
        }
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Checks the fields that a descriptor or config file could get wrong.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::endpoint(self.label(), "host is empty"));
        }
        if self.host.chars().any(char::is_whitespace) {
            return Err(ConfigError::endpoint(self.label(), "host contains whitespace"));
        }
        if self.host.parse::<IpAddr>().is_err() && !is_hostname(&self.host) {
            return Err(ConfigError::endpoint(self.label(), "host is not a valid hostname or IP address"));
        }
        if self.port == 0 && self.kind != ProbeKind::Icmp {
            return Err(ConfigError::endpoint(self.label(), "port 0 is not valid"));
        }
        Ok(())
    }
}

/// Dot-separated labels of ASCII letters, digits, `-` and `_`. Labels may not
/// start or end with `-`.
fn is_hostname(host: &str) -> bool {
    host.len() <= 253
        && host.trim_end_matches('.').split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        })
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.kind)
    }
}

/// Parsed form of a descriptor such as `dns://1.1.1.1:53` or `google.com`,
/// before it has been assigned an [`EndpointId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSpec {
    pub host: String,
    pub port: u16,
    pub kind: ProbeKind,
}

impl EndpointSpec {
    pub fn into_endpoint(self, id: EndpointId) -> Endpoint {
        Endpoint::new(id, self.host, self.port, self.kind)
    }
}

impl FromStr for EndpointSpec {
    type Err = ConfigError;

    /// Accepts `[kind://]host[:port]`. The kind defaults to TCP and the port
    /// to the kind's default. IPv6 hosts must be bracketed when a port is given.
    fn from_str(descriptor: &str) -> Result<Self, Self::Err> {
        let trimmed = descriptor.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::endpoint(descriptor, "descriptor is empty"));
        }

        let (kind, rest) = match trimmed.split_once("://") {
            Some((scheme, rest)) => (scheme.parse::<ProbeKind>()?, rest),
            None => (ProbeKind::Tcp, trimmed),
        };
        let rest = rest.trim_end_matches('/');

        let (host, port) = if let Some(bracketed) = rest.strip_prefix('[') {
            let (host, tail) = bracketed
                .split_once(']')
                .ok_or_else(|| ConfigError::endpoint(descriptor, "unterminated '['"))?;
            let port = match tail.strip_prefix(':') {
                Some(port) => parse_port(descriptor, port)?,
                None if tail.is_empty() => kind.default_port(),
                None => return Err(ConfigError::endpoint(descriptor, "unexpected text after ']'")),
            };
            (host, port)
        } else if rest.matches(':').count() > 1 {
            // Bare IPv6 literal without a port
            (rest, kind.default_port())
        } else if let Some((host, port)) = rest.rsplit_once(':') {
            (host, parse_port(descriptor, port)?)
        } else {
            (rest, kind.default_port())
        };

        let spec = EndpointSpec { host: host.to_string(), port, kind };
        spec.clone().into_endpoint(EndpointId(0)).validate()?;
        Ok(spec)
    }
}

fn parse_port(descriptor: &str, port: &str) -> Result<u16, ConfigError> {
    port.parse::<u16>()
        .map_err(|_| ConfigError::endpoint(descriptor, format!("invalid port '{port}'")))
}

/// Parses a comma-separated descriptor list and assigns ids in order.
/// Empty items are skipped.
pub fn parse_endpoint_list(list: &str) -> Result<Vec<Endpoint>, ConfigError> {
    list.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .enumerate()
        .map(|(i, part)| part.parse::<EndpointSpec>().map(|spec| spec.into_endpoint(EndpointId(i))))
        .collect()
}

/// Endpoints probed when nothing is configured
pub fn default_endpoints() -> Vec<Endpoint> {
    vec![
        Endpoint::new(EndpointId(0), "8.8.8.8", 53, ProbeKind::Tcp),
        Endpoint::new(EndpointId(1), "1.1.1.1", 53, ProbeKind::Tcp),
        Endpoint::new(EndpointId(2), "google.com", 80, ProbeKind::Tcp),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_host_and_port() {
        let spec: EndpointSpec = "8.8.8.8:53".parse().unwrap();
        assert_eq!(spec.host, "8.8.8.8");
        assert_eq!(spec.port, 53);
        assert_eq!(spec.kind, ProbeKind::Tcp);
    }

    #[test]
    fn test_parse_default_port() {
        let spec: EndpointSpec = "example.com".parse().unwrap();
        assert_eq!(spec.port, 80);

        let spec: EndpointSpec = "dns://1.1.1.1".parse().unwrap();
        assert_eq!(spec.kind, ProbeKind::Dns);
        assert_eq!(spec.port, 53);

        let spec: EndpointSpec = "https://example.com/".parse().unwrap();
        assert_eq!(spec.kind, ProbeKind::Https);
        assert_eq!(spec.port, 443);
    }

    #[test]
    fn test_parse_ipv6() {
        let spec: EndpointSpec = "[2606:4700::1111]:53".parse().unwrap();
        assert_eq!(spec.host, "2606:4700::1111");
        assert_eq!(spec.port, 53);

        let spec: EndpointSpec = "icmp://2606:4700::1111".parse().unwrap();
        assert_eq!(spec.host, "2606:4700::1111");
        assert_eq!(spec.kind, ProbeKind::Icmp);
    }

    #[test]
    fn test_parse_rejects_bad_descriptors() {
        assert!("example.com:notaport".parse::<EndpointSpec>().is_err());
        assert!("example.com:0".parse::<EndpointSpec>().is_err());
        assert!("ftp://example.com".parse::<EndpointSpec>().is_err());
        assert!(":80".parse::<EndpointSpec>().is_err());
        assert!("[::1".parse::<EndpointSpec>().is_err());
        assert!("".parse::<EndpointSpec>().is_err());
        assert!("http://example.com/status".parse::<EndpointSpec>().is_err());
        assert!("example.com:80/x".parse::<EndpointSpec>().is_err());
        assert!("example.com?q=1".parse::<EndpointSpec>().is_err());
        assert!("exa#mple.com".parse::<EndpointSpec>().is_err());
        assert!("bad..example.com".parse::<EndpointSpec>().is_err());
    }

    #[test]
    fn test_validate_host_characters() {
        let ok = |host: &str| Endpoint::new(EndpointId(0), host, 80, ProbeKind::Tcp).validate();
        assert!(ok("example.com").is_ok());
        assert!(ok("example.com.").is_ok());
        assert!(ok("my_host-01.lan").is_ok());
        assert!(ok("2606:4700::1111").is_ok());
        assert!(ok("example.com/status").is_err());
        assert!(ok("-example.com").is_err());
    }

    #[test]
    fn test_parse_list_assigns_ids_in_order() {
        let endpoints = parse_endpoint_list("8.8.8.8:53, ,dns://1.1.1.1,google.com").unwrap();
        assert_eq!(endpoints.len(), 3);
        assert_eq!(endpoints[0].id, EndpointId(0));
        assert_eq!(endpoints[1].id, EndpointId(1));
        assert_eq!(endpoints[1].kind, ProbeKind::Dns);
        assert_eq!(endpoints[2].label(), "google.com:80");
    }

    #[test]
    fn test_labels() {
        let v6 = Endpoint::new(EndpointId(0), "::1", 53, ProbeKind::Dns);
        assert_eq!(v6.label(), "[::1]:53");

        let icmp = Endpoint::new(EndpointId(1), "1.1.1.1", 0, ProbeKind::Icmp);
        assert_eq!(icmp.label(), "1.1.1.1");
    }
}
