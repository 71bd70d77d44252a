//! Core types for traceroute operations.

use serde::{Serialize, Serializer};
use std::net::IpAddr;
use std::time::{Duration, Instant};

/// A resolved destination.
///
/// The address is chosen once at trace start and never changes for the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    /// The name as supplied by the user.
    pub hostname: String,
    /// The numeric address every probe is sent to.
    pub addr: IpAddr,
}

impl Target {
    pub fn new(hostname: impl Into<String>, addr: IpAddr) -> Self {
        Self {
            hostname: hostname.into(),
            addr,
        }
    }
}

/// One outbound echo request.
#[derive(Debug, Clone)]
pub struct Probe {
    /// Destination address of the datagram.
    pub dst: IpAddr,
    /// TTL written into the IP header.
    pub ttl: u8,
    /// ICMP identifier, constant for a trace run.
    pub identifier: u16,
    /// ICMP sequence number, unique within a trace run.
    pub sequence: u16,
    /// When the datagram was handed to the sink.
    pub sent_at: Instant,
}

impl Probe {
    /// Time elapsed since the probe was sent.
    pub fn elapsed(&self) -> Duration {
        self.sent_at.elapsed()
    }
}

/// Result of waiting on a single probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProbeOutcome {
    /// A router on the path dropped the probe when its TTL hit zero.
    TimeExceeded {
        responder: IpAddr,
        #[serde(rename = "rtt_ms", serialize_with = "serialize_rtt_ms")]
        rtt: Duration,
    },
    /// The destination answered the echo request.
    EchoReply {
        responder: IpAddr,
        #[serde(rename = "rtt_ms", serialize_with = "serialize_rtt_ms")]
        rtt: Duration,
    },
    /// A router or the destination reported the probe undeliverable.
    Unreachable {
        responder: IpAddr,
        code: u8,
        #[serde(rename = "rtt_ms", serialize_with = "serialize_rtt_ms")]
        rtt: Duration,
    },
    /// Nothing matching arrived before the attempt deadline.
    Timeout,
}

impl ProbeOutcome {
    /// Address that produced this outcome, if any.
    pub fn responder(&self) -> Option<IpAddr> {
        match self {
            Self::TimeExceeded { responder, .. }
            | Self::EchoReply { responder, .. }
            | Self::Unreachable { responder, .. } => Some(*responder),
            Self::Timeout => None,
        }
    }

    /// Round-trip time, if a response arrived.
    pub fn rtt(&self) -> Option<Duration> {
        match self {
            Self::TimeExceeded { rtt, .. }
            | Self::EchoReply { rtt, .. }
            | Self::Unreachable { rtt, .. } => Some(*rtt),
            Self::Timeout => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable { .. })
    }
}

fn serialize_rtt_ms<S: Serializer>(rtt: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(rtt.as_secs_f64() * 1000.0)
}

/// Short annotation for an ICMP Destination Unreachable code, as printed by
/// classic traceroute implementations.
pub fn unreachable_annotation(code: u8) -> String {
    match code {
        0 => "!N".to_string(),
        1 => "!H".to_string(),
        2 => "!P".to_string(),
        3 => "!p".to_string(),
        4 => "!F".to_string(),
        5 => "!S".to_string(),
        9 | 10 | 13 => "!X".to_string(),
        other => format!("!<{}>", other),
    }
}

/// Parameters for traceroute execution.
#[derive(Debug, Clone)]
pub struct TracerouteParams {
    /// Maximum TTL to probe.
    pub max_hops: u8,
    /// Attempts per TTL before the hop is given up on.
    pub retries: u8,
    /// How long each attempt waits for a matching response.
    pub timeout: Duration,
}

impl Default for TracerouteParams {
    fn default() -> Self {
        Self {
            max_hops: 30,
            retries: 3,
            timeout: Duration::from_secs(1),
        }
    }
}

impl TracerouteParams {
    /// Validates the parameters.
    pub fn validate(&self) -> Result<(), crate::TracerouteError> {
        if self.max_hops == 0 {
            return Err(crate::TracerouteError::InvalidMaxHops(self.max_hops));
        }
        if self.retries == 0 {
            return Err(crate::TracerouteError::InvalidRetries(self.retries));
        }
        Ok(())
    }
}

/// High-level traceroute configuration.
#[derive(Debug, Clone, Default)]
pub struct TracerouteConfig {
    /// Target hostname or IP address.
    pub hostname: String,
    /// Traceroute parameters.
    pub params: TracerouteParams,
}
