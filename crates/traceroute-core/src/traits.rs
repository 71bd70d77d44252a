//! Core traits for traceroute driver implementations.

use crate::{Probe, ProbeOutcome, TracerouteError};
use async_trait::async_trait;
use std::net::IpAddr;
use std::time::Duration;

/// Core trait for probe drivers.
///
/// A driver owns the transport for a single trace run. It turns a TTL into a
/// sent [`Probe`] and turns raw inbound traffic into outcomes for that probe.
#[async_trait]
pub trait TracerouteDriver: Send {
    /// Sends a probe with the specified TTL and a fresh sequence number.
    async fn send_probe(&mut self, ttl: u8) -> Result<Probe, TracerouteError>;

    /// Waits up to `timeout` for the next inbound packet and classifies it
    /// against `probe`.
    ///
    /// Returns `Ok(None)` if nothing arrived within the timeout.
    /// Returns `Err(PacketMismatch)` for traffic that belongs to some other probe;
    /// callers keep waiting on the same attempt.
    async fn receive_probe(
        &mut self,
        probe: &Probe,
        timeout: Duration,
    ) -> Result<Option<ProbeOutcome>, TracerouteError>;

    /// Closes the driver, releasing resources.
    async fn close(&mut self) -> Result<(), TracerouteError>;
}

/// Name resolution collaborator.
#[async_trait]
pub trait Resolve: Send + Sync {
    /// Returns candidate addresses for `hostname`, in resolver order.
    ///
    /// Fails with [`TracerouteError::ResolutionFailed`] when the name is unknown.
    async fn lookup(&self, hostname: &str) -> Result<Vec<IpAddr>, TracerouteError>;
}
