//! ICMP traceroute driver implementation.

use crate::classify::{classify, Classification};
use crate::packet::build_echo_request;
use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::{Duration, Instant};
use traceroute_core::{Probe, ProbeOutcome, TracerouteDriver, TracerouteError};
use traceroute_packets::{Received, Sink, Source};
use tracing::{debug, trace};

/// Large enough for any ICMP message we care about on a standard MTU link.
const RECV_BUFFER_LEN: usize = 1500;

/// Global echo ID counter for unique IDs across driver instances.
static ECHO_ID_COUNTER: AtomicU16 = AtomicU16::new(0);

/// Gets the next echo ID: the process ID mixed with a per-process counter so
/// that concurrent traces, in this process or others, rarely collide.
fn next_echo_id() -> u16 {
    let pid = std::process::id() as u16;
    pid.wrapping_add(ECHO_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
}

/// ICMP traceroute driver.
///
/// Owns the transport for one trace run. Every probe carries the same
/// identifier and a fresh sequence number.
pub struct IcmpDriver {
    /// Source address written into outgoing headers.
    src_ip: Ipv4Addr,
    /// Destination of every probe.
    target_ip: IpAddr,
    source: Box<dyn Source>,
    sink: Box<dyn Sink>,
    buffer: Vec<u8>,
    /// Echo ID for this traceroute session.
    echo_id: u16,
    /// Sequence number for the next probe.
    next_seq: Option<u16>,
}

impl IcmpDriver {
    /// Creates a new ICMP driver.
    pub fn new(
        src_ip: Ipv4Addr,
        target_ip: IpAddr,
        source: Box<dyn Source>,
        sink: Box<dyn Sink>,
    ) -> Self {
        Self::with_echo_id(src_ip, target_ip, source, sink, next_echo_id())
    }

    /// Creates a driver with a fixed echo identifier.
    pub fn with_echo_id(
        src_ip: Ipv4Addr,
        target_ip: IpAddr,
        source: Box<dyn Source>,
        sink: Box<dyn Sink>,
        echo_id: u16,
    ) -> Self {
        Self {
            src_ip,
            target_ip,
            source,
            sink,
            buffer: vec![0u8; RECV_BUFFER_LEN],
            echo_id,
            next_seq: Some(1),
        }
    }

    pub fn echo_id(&self) -> u16 {
        self.echo_id
    }

    fn take_sequence(&mut self) -> Result<u16, TracerouteError> {
        let seq = self.next_seq.ok_or(TracerouteError::SequenceExhausted)?;
        self.next_seq = seq.checked_add(1);
        Ok(seq)
    }
}

#[async_trait]
impl TracerouteDriver for IcmpDriver {
    async fn send_probe(&mut self, ttl: u8) -> Result<Probe, TracerouteError> {
        let seq = self.take_sequence()?;
        let packet = build_echo_request(self.src_ip, self.target_ip, ttl, self.echo_id, seq)?;

        trace!(
            ttl = ttl,
            echo_id = self.echo_id,
            seq = seq,
            "Sending ICMP Echo Request probe"
        );

        self.sink.write_to(&packet, self.target_ip).await?;

        Ok(Probe {
            dst: self.target_ip,
            ttl,
            identifier: self.echo_id,
            sequence: seq,
            sent_at: Instant::now(),
        })
    }

    async fn receive_probe(
        &mut self,
        probe: &Probe,
        timeout: Duration,
    ) -> Result<Option<ProbeOutcome>, TracerouteError> {
        let n = match self.source.recv_from(&mut self.buffer, timeout).await? {
            Received::Packet { len, from } => {
                trace!(len = len, from = %from, "Received ICMP packet");
                len
            }
            Received::Timeout => return Ok(None),
        };

        match classify(&self.buffer[..n], probe) {
            Classification::Unrelated => Err(TracerouteError::PacketMismatch),
            matched => {
                let rtt = probe.elapsed();
                debug!(ttl = probe.ttl, seq = probe.sequence, outcome = ?matched, "Matched probe");
                Ok(matched.into_outcome(rtt))
            }
        }
    }

    async fn close(&mut self) -> Result<(), TracerouteError> {
        let sink_result = self.sink.close().await;
        let source_result = self.source.close().await;

        sink_result?;
        source_result?;

        Ok(())
    }
}
