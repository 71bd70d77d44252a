//! Result types for traceroute output.

use crate::types::{unreachable_annotation, ProbeOutcome, Target};
use serde::Serialize;
use std::fmt;
use std::net::IpAddr;

/// Final result for one TTL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HopRecord {
    /// The TTL for this hop.
    ttl: u8,
    /// Address of the first non-timeout outcome.
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<IpAddr>,
    /// One outcome per attempt, in send order.
    outcomes: Vec<ProbeOutcome>,
}

impl HopRecord {
    pub fn new(ttl: u8, outcomes: Vec<ProbeOutcome>) -> Self {
        let address = outcomes.iter().find_map(ProbeOutcome::responder);
        Self {
            ttl,
            address,
            outcomes,
        }
    }

    pub(crate) fn push(&mut self, outcome: ProbeOutcome) {
        if self.address.is_none() {
            self.address = outcome.responder();
        }
        self.outcomes.push(outcome);
    }

    pub fn ttl(&self) -> u8 {
        self.ttl
    }

    /// Address of the first non-timeout outcome, or `None` if every attempt timed out.
    pub fn resolved_address(&self) -> Option<IpAddr> {
        self.address
    }

    pub fn outcomes(&self) -> &[ProbeOutcome] {
        &self.outcomes
    }

    /// Number of attempts made at this TTL.
    pub fn attempts(&self) -> usize {
        self.outcomes.len()
    }

    /// Whether any attempt produced a non-timeout outcome.
    pub fn is_resolved(&self) -> bool {
        self.address.is_some()
    }

    /// The Destination Unreachable outcome for this hop, if one was received.
    pub fn unreachable(&self) -> Option<&ProbeOutcome> {
        self.outcomes.iter().find(|o| o.is_unreachable())
    }

    /// Whether an Echo Reply was received for this hop.
    pub fn has_echo_reply(&self) -> bool {
        self.outcomes
            .iter()
            .any(|o| matches!(o, ProbeOutcome::EchoReply { .. }))
    }
}

impl fmt::Display for HopRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>2}  ", self.ttl)?;
        match self.address {
            Some(ip) => write!(f, "{}", ip)?,
            None => write!(f, "*")?,
        }
        for outcome in &self.outcomes {
            match outcome {
                ProbeOutcome::Timeout => write!(f, "  *")?,
                ProbeOutcome::Unreachable { rtt, code, .. } => write!(
                    f,
                    "  {:.3} ms {}",
                    rtt.as_secs_f64() * 1000.0,
                    unreachable_annotation(*code)
                )?,
                ProbeOutcome::TimeExceeded { rtt, .. } | ProbeOutcome::EchoReply { rtt, .. } => {
                    write!(f, "  {:.3} ms", rtt.as_secs_f64() * 1000.0)?
                }
            }
        }
        Ok(())
    }
}

/// Ordered hop records for one trace run.
///
/// Hops are only ever appended while the run is in progress. Once the run
/// returns the result, nothing can change it.
#[derive(Debug, Clone, Serialize)]
pub struct TraceResult {
    /// The resolved destination.
    target: Target,
    /// Maximum TTL the run was allowed to probe.
    max_hops: u8,
    /// Hops indexed by TTL, starting at 1.
    hops: Vec<HopRecord>,
    /// TTL at which the destination answered.
    #[serde(skip_serializing_if = "Option::is_none")]
    reached_ttl: Option<u8>,
    /// Whether the run stopped early because it was cancelled.
    interrupted: bool,
}

impl TraceResult {
    pub(crate) fn new(target: Target, max_hops: u8) -> Self {
        Self {
            target,
            max_hops,
            hops: Vec::new(),
            reached_ttl: None,
            interrupted: false,
        }
    }

    pub(crate) fn push_hop(&mut self, hop: HopRecord) {
        debug_assert_eq!(hop.ttl as usize, self.hops.len() + 1);
        self.hops.push(hop);
    }

    pub(crate) fn mark_reached(&mut self, ttl: u8) {
        self.reached_ttl = Some(ttl);
    }

    pub(crate) fn mark_interrupted(&mut self) {
        self.interrupted = true;
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn max_hops(&self) -> u8 {
        self.max_hops
    }

    pub fn hops(&self) -> &[HopRecord] {
        &self.hops
    }

    /// Hop record for a TTL (1-based).
    pub fn hop(&self, ttl: u8) -> Option<&HopRecord> {
        (ttl as usize)
            .checked_sub(1)
            .and_then(|idx| self.hops.get(idx))
    }

    pub fn destination_reached(&self) -> bool {
        self.reached_ttl.is_some()
    }

    pub fn reached_ttl(&self) -> Option<u8> {
        self.reached_ttl
    }

    pub fn interrupted(&self) -> bool {
        self.interrupted
    }

    /// Serializes the result to JSON with indentation.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Renders the classic one-line-per-hop listing.
    pub fn to_text(&self) -> String {
        let mut out = format!(
            "traceroute to {} ({}), {} hops max\n",
            self.target.hostname, self.target.addr, self.max_hops
        );
        for hop in &self.hops {
            out.push_str(&hop.to_string());
            out.push('\n');
        }
        out
    }
}
