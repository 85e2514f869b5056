use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use hickory_resolver::TokioResolver;
use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig};
use hickory_resolver::name_server::TokioConnectionProvider;

use super::resolve::build_resolver;
use super::{ProbeError, Prober, literal_ip};
use crate::endpoint::{Endpoint, EndpointId, ProbeKind};
use crate::settings::ResolverChoice;

/// Times a DNS lookup with caching disabled.
///
/// An endpoint whose host is an IP address is treated as a nameserver and is
/// asked for `query_name`. Any other host is itself the name looked up,
/// through the configured resolver.
pub struct DnsProber {
    query_name: String,
    shared: TokioResolver,
    nameservers: HashMap<EndpointId, TokioResolver>,
}

impl DnsProber {
    pub fn new(endpoints: &[Endpoint], choice: ResolverChoice, query_name: &str) -> Result<Self> {
        if query_name.trim().is_empty() {
            return Err(anyhow!("DNS query name must not be empty"));
        }

        let nameservers = endpoints
            .iter()
            .filter(|endpoint| endpoint.kind == ProbeKind::Dns)
            .filter_map(|endpoint| literal_ip(&endpoint.host).map(|ip| (endpoint.id, ip, endpoint.port)))
            .map(|(id, ip, port)| (id, nameserver_resolver(ip, port)))
            .collect();

        Ok(Self {
            query_name: query_name.to_string(),
            shared: build_resolver(choice, false),
            nameservers,
        })
    }

    async fn lookup(resolver: &TokioResolver, name: &str) -> Result<Duration, ProbeError> {
        let start = Instant::now();
        let lookup = resolver
            .lookup_ip(name)
            .await
            .map_err(|e| ProbeError::Resolution(e.to_string()))?;
        let elapsed = start.elapsed();

        if lookup.iter().next().is_none() {
            return Err(ProbeError::Resolution(format!("no addresses for {name}")));
        }
        Ok(elapsed)
    }
}

fn nameserver_resolver(ip: IpAddr, port: u16) -> TokioResolver {
    let group = NameServerConfigGroup::from_ips_clear(&[ip], port, true);
    let config = ResolverConfig::from_parts(None, vec![], group);

    let mut builder =
        TokioResolver::builder_with_config(config, TokioConnectionProvider::default());
    let opts = builder.options_mut();
    opts.attempts = 1;
    opts.cache_size = 0;
    builder.build()
}

#[async_trait::async_trait]
impl Prober for DnsProber {
    async fn measure(&self, endpoint: &Endpoint, _timeout: Duration) -> Result<Duration, ProbeError> {
        match self.nameservers.get(&endpoint.id) {
            Some(resolver) => Self::lookup(resolver, &self.query_name).await,
            None => Self::lookup(&self.shared, &endpoint.host).await,
        }
    }
}
