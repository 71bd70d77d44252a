//! Packet formats and packet I/O for ICMP traceroute.
//!
//! Provides the Internet checksum, fixed-layout IPv4/ICMP headers, inbound
//! frame parsing, and platform-agnostic interfaces for sending and receiving
//! raw packets.

pub mod checksum;
pub mod header;
pub mod parser;
pub mod platform;
pub mod sink;
pub mod source;

pub use checksum::checksum;
pub use header::{IcmpHeader, Ipv4Header};
pub use parser::{parse_icmp_frame, IcmpFrame, QuotedDatagram};
pub use sink::Sink;
pub use source::{Received, Source};

/// Handle containing both source and sink for packet I/O.
pub struct SourceSinkHandle {
    /// Inbound ICMP capture.
    pub source: Box<dyn Source>,
    /// Raw IP transmission.
    pub sink: Box<dyn Sink>,
}

/// Opens the raw sockets appropriate for the current platform.
///
/// Fails with [`traceroute_core::TracerouteError::PermissionDenied`] when the
/// process lacks the privilege to open raw sockets.
pub fn new_source_sink() -> Result<SourceSinkHandle, traceroute_core::TracerouteError> {
    platform::new_source_sink()
}
