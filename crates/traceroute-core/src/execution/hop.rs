//! Per-TTL probing.
//!
//! Each attempt sends one probe and waits for a response that matches it.
//! Traffic for other probes is discarded without ending the attempt. The hop
//! is finished as soon as any attempt gets a real response, or once the retry
//! budget is spent.

use crate::{HopRecord, ProbeOutcome, TracerouteDriver, TracerouteError, TracerouteParams};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Probes a single TTL and returns its hop record.
///
/// Attempts stop early once a non-timeout outcome is recorded. Cancellation is
/// checked before each attempt; a cancelled hop holds the attempts made so far.
pub async fn probe_hop<D: TracerouteDriver + ?Sized>(
    driver: &mut D,
    ttl: u8,
    params: &TracerouteParams,
    cancel: &CancellationToken,
) -> Result<HopRecord, TracerouteError> {
    let mut hop = HopRecord::new(ttl, Vec::with_capacity(params.retries as usize));

    for attempt in 1..=params.retries {
        if cancel.is_cancelled() {
            debug!(ttl = ttl, attempt = attempt, "Cancelled before attempt");
            break;
        }

        let outcome = run_attempt(driver, ttl, params).await?;
        let answered = !outcome.is_timeout();
        hop.push(outcome);

        if answered {
            break;
        }
        debug!(ttl = ttl, attempt = attempt, "Attempt timed out");
    }

    Ok(hop)
}

/// Sends one probe and waits for its outcome.
///
/// Only fatal errors escape; any other failure costs this attempt and is
/// recorded as a timeout.
async fn run_attempt<D: TracerouteDriver + ?Sized>(
    driver: &mut D,
    ttl: u8,
    params: &TracerouteParams,
) -> Result<ProbeOutcome, TracerouteError> {
    let probe = match driver.send_probe(ttl).await {
        Ok(probe) => probe,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            warn!(ttl = ttl, error = %e, "Failed to send probe");
            return Ok(ProbeOutcome::Timeout);
        }
    };
    trace!(ttl = ttl, seq = probe.sequence, "Probe sent");

    let deadline = Instant::now() + params.timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(ProbeOutcome::Timeout);
        }

        match driver.receive_probe(&probe, remaining).await {
            Ok(Some(outcome)) => {
                debug!(
                    ttl = ttl,
                    seq = probe.sequence,
                    ip = ?outcome.responder(),
                    rtt_ms = outcome.rtt().map(|rtt| rtt.as_secs_f64() * 1000.0),
                    "Received probe response"
                );
                return Ok(outcome);
            }
            Ok(None) => return Ok(ProbeOutcome::Timeout),
            Err(e) if e.is_retryable() => {
                trace!(error = %e, "Retryable error, continuing");
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(ttl = ttl, seq = probe.sequence, error = %e, "Receive failed");
                return Ok(ProbeOutcome::Timeout);
            }
        }
    }
}
