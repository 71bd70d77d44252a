//! Scripted driver for execution tests.

use crate::{Probe, ProbeOutcome, TracerouteDriver, TracerouteError};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::time::{Duration, Instant};

pub(crate) type Reply = Result<Option<ProbeOutcome>, TracerouteError>;

/// Replays canned receive results per TTL. An empty script means silence.
pub(crate) struct ScriptedDriver {
    pub destination: IpAddr,
    pub replies: HashMap<u8, VecDeque<Reply>>,
    pub send_errors: HashMap<u8, VecDeque<TracerouteError>>,
    pub sent: Vec<Probe>,
    pub receive_calls: usize,
    next_sequence: u16,
}

impl ScriptedDriver {
    pub fn new(destination: IpAddr) -> Self {
        Self {
            destination,
            replies: HashMap::new(),
            send_errors: HashMap::new(),
            sent: Vec::new(),
            receive_calls: 0,
            next_sequence: 1,
        }
    }

    pub fn reply(mut self, ttl: u8, reply: Reply) -> Self {
        self.replies.entry(ttl).or_default().push_back(reply);
        self
    }

    pub fn fail_send(mut self, ttl: u8, err: TracerouteError) -> Self {
        self.send_errors.entry(ttl).or_default().push_back(err);
        self
    }
}

#[async_trait]
impl TracerouteDriver for ScriptedDriver {
    async fn send_probe(&mut self, ttl: u8) -> Result<Probe, TracerouteError> {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        if let Some(err) = self.send_errors.get_mut(&ttl).and_then(VecDeque::pop_front) {
            return Err(err);
        }
        let probe = Probe {
            dst: self.destination,
            ttl,
            identifier: 0x4242,
            sequence,
            sent_at: Instant::now(),
        };
        self.sent.push(probe.clone());
        Ok(probe)
    }

    async fn receive_probe(
        &mut self,
        probe: &Probe,
        _timeout: Duration,
    ) -> Result<Option<ProbeOutcome>, TracerouteError> {
        self.receive_calls += 1;
        self.replies
            .get_mut(&probe.ttl)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Ok(None))
    }

    async fn close(&mut self) -> Result<(), TracerouteError> {
        Ok(())
    }
}
