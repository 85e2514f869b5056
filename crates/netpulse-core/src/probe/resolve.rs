use std::net::IpAddr;

use hickory_resolver::TokioResolver;
use hickory_resolver::config::ResolverConfig;
use hickory_resolver::name_server::TokioConnectionProvider;
use tracing::{debug, warn};

use super::{ProbeError, literal_ip};
use crate::settings::ResolverChoice;

/// Caching resolver used to turn probe targets into addresses
#[derive(Clone)]
pub struct HostResolver {
    resolver: TokioResolver,
}

impl HostResolver {
    pub fn new(choice: ResolverChoice) -> Self {
        Self { resolver: build_resolver(choice, true) }
    }

    pub async fn resolve(&self, host: &str) -> Result<IpAddr, ProbeError> {
        if let Some(ip) = literal_ip(host) {
            return Ok(ip);
        }
        let lookup = self
            .resolver
            .lookup_ip(host)
            .await
            .map_err(|e| ProbeError::Resolution(e.to_string()))?;
        lookup.iter().next().ok_or_else(|| ProbeError::Resolution("No IP Address Found".into()))
    }
}

/// Builds a resolver for the chosen nameservers. `cache` disables the answer
/// cache when false so every lookup goes to the wire.
pub(crate) fn build_resolver(choice: ResolverChoice, cache: bool) -> TokioResolver {
    let mut builder = match choice {
        ResolverChoice::System => match TokioResolver::builder_tokio() {
            Ok(builder) => builder,
            Err(e) => {
                warn!("System resolver configuration unavailable, using Cloudflare: {}", e);
                TokioResolver::builder_with_config(
                    ResolverConfig::cloudflare(),
                    TokioConnectionProvider::default(),
                )
            }
        },
        ResolverChoice::Cloudflare => TokioResolver::builder_with_config(
            ResolverConfig::cloudflare(),
            TokioConnectionProvider::default(),
        ),
        ResolverChoice::Google => TokioResolver::builder_with_config(
            ResolverConfig::google(),
            TokioConnectionProvider::default(),
        ),
    };

    let opts = builder.options_mut();
    opts.attempts = 1;
    if !cache {
        opts.cache_size = 0;
    }

    debug!(resolver = ?choice, cache, "DNS resolver configured");
    builder.build()
}
