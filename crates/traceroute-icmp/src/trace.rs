//! Trace orchestration: resolve, open the transport, walk the TTLs.

use crate::driver::IcmpDriver;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use traceroute_core::execution::traceroute_serial;
use traceroute_core::{
    Resolve, Target, TraceResult, TracerouteDriver, TracerouteError, TracerouteParams,
};
use traceroute_packets::{new_source_sink, SourceSinkHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Resolves `hostname` into a [`Target`].
///
/// Literal addresses skip the resolver. Otherwise the first IPv4 candidate is
/// chosen, falling back to the first candidate of any family. This deliberately
/// differs from taking the first candidate as-is: probes are IPv4 only, so an
/// AAAA record listed first would otherwise fail every trace to a dual-stack
/// host.
pub async fn resolve_target<R: Resolve + ?Sized>(
    resolver: &R,
    hostname: &str,
) -> Result<Target, TracerouteError> {
    if let Ok(ip) = hostname.parse::<IpAddr>() {
        return Ok(Target::new(hostname, ip));
    }

    let candidates = resolver.lookup(hostname).await?;
    debug!(hostname = hostname, candidates = ?candidates, "Resolved hostname");

    candidates
        .iter()
        .find(|ip| ip.is_ipv4())
        .or_else(|| candidates.first())
        .map(|ip| Target::new(hostname, *ip))
        .ok_or_else(|| TracerouteError::ResolutionFailed {
            hostname: hostname.to_string(),
            reason: "no addresses found".to_string(),
        })
}

/// Picks the local address the kernel would use to reach `target`.
///
/// Connecting a UDP socket sends nothing; it only asks the routing table.
/// Falls back to the unspecified address, which lets the kernel fill in the
/// source when the datagram goes out.
pub fn local_addr_for(target: IpAddr) -> Ipv4Addr {
    let lookup = || -> std::io::Result<IpAddr> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.connect(SocketAddr::new(target, 33434))?;
        Ok(socket.local_addr()?.ip())
    };

    match lookup() {
        Ok(IpAddr::V4(ip)) => ip,
        Ok(IpAddr::V6(_)) => Ipv4Addr::UNSPECIFIED,
        Err(e) => {
            debug!(target = %target, error = %e, "No route lookup, using unspecified source");
            Ipv4Addr::UNSPECIFIED
        }
    }
}

/// Runs a complete ICMP traceroute over raw sockets.
pub async fn trace<R: Resolve + ?Sized>(
    resolver: &R,
    hostname: &str,
    params: &TracerouteParams,
    cancel: &CancellationToken,
) -> Result<TraceResult, TracerouteError> {
    trace_with(resolver, hostname, params, cancel, new_source_sink).await
}

/// Runs a complete ICMP traceroute over the transport returned by `open`.
///
/// Parameters are validated and the name resolved before `open` is called,
/// so a bad name never touches a socket. The transport is closed whether or
/// not the trace succeeds.
pub async fn trace_with<R, F>(
    resolver: &R,
    hostname: &str,
    params: &TracerouteParams,
    cancel: &CancellationToken,
    open: F,
) -> Result<TraceResult, TracerouteError>
where
    R: Resolve + ?Sized,
    F: FnOnce() -> Result<SourceSinkHandle, TracerouteError>,
{
    params.validate()?;

    let target = resolve_target(resolver, hostname).await?;
    let src_ip = local_addr_for(target.addr);

    info!(
        target = %target.hostname,
        addr = %target.addr,
        src = %src_ip,
        max_hops = params.max_hops,
        retries = params.retries,
        "Starting traceroute"
    );

    let handle = open()?;
    let mut driver = IcmpDriver::new(src_ip, target.addr, handle.source, handle.sink);
    debug!(echo_id = driver.echo_id(), "Opened transport");

    let result = traceroute_serial(&mut driver, &target, params, cancel).await;

    if let Err(e) = driver.close().await {
        warn!(error = %e, "Failed to close transport");
    }

    if let Ok(result) = &result {
        info!(
            hops = result.hops().len(),
            reached = ?result.reached_ttl(),
            interrupted = result.interrupted(),
            "Traceroute finished"
        );
    }

    result
}
