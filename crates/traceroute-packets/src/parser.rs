//! Inbound ICMP frame parsing.
//!
//! Raw ICMP sockets deliver the full IPv4 datagram. Error messages (Time
//! Exceeded, Destination Unreachable) quote the offending datagram's IP
//! header plus at least the first 8 bytes of its payload, which is enough to
//! recover the ICMP header of the probe that triggered them.

use crate::header::{
    IcmpHeader, Ipv4Header, ICMP_DEST_UNREACHABLE, ICMP_HEADER_LEN, ICMP_TIME_EXCEEDED,
    IPPROTO_ICMP,
};
use traceroute_core::TracerouteError;

/// The portion of the original datagram carried inside an ICMP error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotedDatagram {
    /// The original IP header, as the router saw it.
    pub ip: Ipv4Header,
    /// The first 8 bytes of the original payload.
    pub head: [u8; 8],
}

impl QuotedDatagram {
    /// Interprets the quoted payload head as an ICMP header.
    pub fn icmp(&self) -> Option<IcmpHeader> {
        if self.ip.protocol != IPPROTO_ICMP {
            return None;
        }
        IcmpHeader::decode(&self.head).ok()
    }
}

/// A parsed inbound ICMP message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcmpFrame {
    /// Outer IP header; its source is the responder.
    pub ip: Ipv4Header,
    /// Outer ICMP header.
    pub icmp: IcmpHeader,
    /// Quoted datagram for error messages.
    pub quoted: Option<QuotedDatagram>,
}

/// Whether the message type carries a quoted datagram.
fn is_error_type(icmp_type: u8) -> bool {
    matches!(icmp_type, ICMP_TIME_EXCEEDED | ICMP_DEST_UNREACHABLE)
}

/// Parses a raw buffer (starting at the IP layer) as an IPv4 ICMP message.
///
/// Returns [`TracerouteError::PacketMismatch`] for non-ICMP datagrams and a
/// parse error for anything truncated or malformed.
pub fn parse_icmp_frame(data: &[u8]) -> Result<IcmpFrame, TracerouteError> {
    let (ip, header_len) = Ipv4Header::decode(data)?;
    if ip.protocol != IPPROTO_ICMP {
        return Err(TracerouteError::PacketMismatch);
    }

    let icmp_bytes = &data[header_len..];
    let icmp = IcmpHeader::decode(icmp_bytes).map_err(|e| match e {
        TracerouteError::PacketTooShort { expected, actual } => TracerouteError::PacketTooShort {
            expected: header_len + expected,
            actual: header_len + actual,
        },
        other => other,
    })?;

    let quoted = if is_error_type(icmp.icmp_type) {
        Some(parse_quoted(&icmp_bytes[ICMP_HEADER_LEN..])?)
    } else {
        None
    };

    Ok(IcmpFrame { ip, icmp, quoted })
}

fn parse_quoted(payload: &[u8]) -> Result<QuotedDatagram, TracerouteError> {
    let (ip, header_len) = Ipv4Header::decode(payload).map_err(|e| {
        TracerouteError::PacketParseFailed {
            layer: "Inner IP",
            reason: e.to_string(),
        }
    })?;

    let rest = &payload[header_len..];
    if rest.len() < 8 {
        return Err(TracerouteError::PacketParseFailed {
            layer: "Inner IP",
            reason: format!("quoted payload is {} bytes, need 8", rest.len()),
        });
    }

    let mut head = [0u8; 8];
    head.copy_from_slice(&rest[..8]);
    Ok(QuotedDatagram { ip, head })
}
