//! Matching inbound ICMP traffic to an outstanding probe.
//!
//! The receive socket sees every ICMP message delivered to the host, so each
//! frame is checked against the probe's identifier and sequence number. Error
//! messages are matched through the datagram they quote, never through the
//! outer header alone.

use std::net::IpAddr;
use std::time::Duration;
use traceroute_core::{Probe, ProbeOutcome};
use traceroute_packets::header::{
    ICMP_DEST_UNREACHABLE, ICMP_ECHO_REPLY, ICMP_ECHO_REQUEST, ICMP_TIME_EXCEEDED, IPPROTO_ICMP,
};
use traceroute_packets::{parse_icmp_frame, IcmpFrame};
use tracing::trace;

/// How an inbound frame relates to a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// A router dropped the probe when its TTL expired.
    TimeExceeded { responder: IpAddr },
    /// The destination answered the probe.
    EchoReply { responder: IpAddr },
    /// The probe was reported undeliverable.
    Unreachable { responder: IpAddr, code: u8 },
    /// Malformed, foreign, or belonging to some other probe.
    Unrelated,
}

impl Classification {
    /// Converts a match into an outcome with the given round-trip time.
    ///
    /// Returns `None` for [`Classification::Unrelated`].
    pub fn into_outcome(self, rtt: Duration) -> Option<ProbeOutcome> {
        match self {
            Self::TimeExceeded { responder } => Some(ProbeOutcome::TimeExceeded { responder, rtt }),
            Self::EchoReply { responder } => Some(ProbeOutcome::EchoReply { responder, rtt }),
            Self::Unreachable { responder, code } => Some(ProbeOutcome::Unreachable {
                responder,
                code,
                rtt,
            }),
            Self::Unrelated => None,
        }
    }
}

/// Classifies a raw datagram (starting at the IP layer) against `probe`.
///
/// Never fails: anything that cannot be parsed is [`Classification::Unrelated`].
pub fn classify(data: &[u8], probe: &Probe) -> Classification {
    let frame = match parse_icmp_frame(data) {
        Ok(frame) => frame,
        Err(e) => {
            trace!(error = %e, len = data.len(), "Discarding unparseable packet");
            return Classification::Unrelated;
        }
    };
    let responder = IpAddr::V4(frame.ip.source);

    match frame.icmp.icmp_type {
        ICMP_ECHO_REPLY => {
            let (id, seq) = (frame.icmp.identifier(), frame.icmp.sequence());
            if id == probe.identifier && seq == probe.sequence {
                Classification::EchoReply { responder }
            } else {
                trace!(
                    expected_id = probe.identifier,
                    expected_seq = probe.sequence,
                    id = id,
                    seq = seq,
                    "Ignored ICMP Echo Reply for another probe"
                );
                Classification::Unrelated
            }
        }
        ICMP_TIME_EXCEEDED if quotes_probe(&frame, probe) => {
            Classification::TimeExceeded { responder }
        }
        ICMP_DEST_UNREACHABLE if quotes_probe(&frame, probe) => Classification::Unreachable {
            responder,
            code: frame.icmp.code,
        },
        other => {
            trace!(icmp_type = other, from = %responder, "Ignored unrelated ICMP message");
            Classification::Unrelated
        }
    }
}

/// Whether an error message quotes the echo request described by `probe`.
fn quotes_probe(frame: &IcmpFrame, probe: &Probe) -> bool {
    let Some(quoted) = frame.quoted else {
        return false;
    };
    if quoted.ip.protocol != IPPROTO_ICMP || IpAddr::V4(quoted.ip.destination) != probe.dst {
        trace!(
            protocol = quoted.ip.protocol,
            dst = %quoted.ip.destination,
            "Quoted datagram was not sent to the target"
        );
        return false;
    }
    let Some(inner) = quoted.icmp() else {
        return false;
    };
    if inner.icmp_type != ICMP_ECHO_REQUEST {
        return false;
    }
    if inner.identifier() != probe.identifier || inner.sequence() != probe.sequence {
        trace!(
            expected_id = probe.identifier,
            expected_seq = probe.sequence,
            id = inner.identifier(),
            seq = inner.sequence(),
            "Quoted echo request belongs to another probe"
        );
        return false;
    }
    true
}
