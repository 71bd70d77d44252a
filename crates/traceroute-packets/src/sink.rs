//! Packet transmission sink trait.

use async_trait::async_trait;
use std::net::IpAddr;
use traceroute_core::TracerouteError;

/// Trait for packet transmission.
#[async_trait]
pub trait Sink: Send {
    /// Writes a complete IP datagram, header included, towards `addr`.
    async fn write_to(&mut self, buf: &[u8], addr: IpAddr) -> Result<(), TracerouteError>;

    /// Closes the sink.
    async fn close(&mut self) -> Result<(), TracerouteError>;
}
