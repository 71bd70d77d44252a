//! Traceroute runner that wires the system resolver into the ICMP trace.

use async_trait::async_trait;
use std::net::IpAddr;
use tokio_util::sync::CancellationToken;
use traceroute_core::{Resolve, TraceResult, TracerouteConfig, TracerouteError};
use tracing::debug;

/// Resolves names with the operating system's resolver.
pub struct SystemResolver;

#[async_trait]
impl Resolve for SystemResolver {
    async fn lookup(&self, hostname: &str) -> Result<Vec<IpAddr>, TracerouteError> {
        let addrs = tokio::net::lookup_host((hostname, 0))
            .await
            .map_err(|e| TracerouteError::ResolutionFailed {
                hostname: hostname.to_string(),
                reason: e.to_string(),
            })?;

        let mut ips: Vec<IpAddr> = Vec::new();
        for addr in addrs {
            if !ips.contains(&addr.ip()) {
                ips.push(addr.ip());
            }
        }
        debug!(hostname = hostname, count = ips.len(), "System resolver answered");
        Ok(ips)
    }
}

/// Run a traceroute and return the results.
pub async fn run_traceroute(
    config: &TracerouteConfig,
    cancel: &CancellationToken,
) -> Result<TraceResult, TracerouteError> {
    traceroute_icmp::trace(&SystemResolver, &config.hostname, &config.params, cancel).await
}
