//! Packet capture source trait.

use async_trait::async_trait;
use std::net::IpAddr;
use std::time::Duration;
use traceroute_core::TracerouteError;

/// Outcome of a single receive call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Received {
    /// A datagram (starting at the IP layer) of `len` bytes was read from `from`.
    Packet { len: usize, from: IpAddr },
    /// Nothing arrived before the timeout expired.
    Timeout,
}

/// Trait for packet capture sources.
#[async_trait]
pub trait Source: Send {
    /// Reads the next inbound ICMP datagram into `buf`, waiting at most `timeout`.
    ///
    /// Expiry is reported as [`Received::Timeout`], never as an error.
    async fn recv_from(
        &mut self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<Received, TracerouteError>;

    /// Closes the source.
    async fn close(&mut self) -> Result<(), TracerouteError>;
}
