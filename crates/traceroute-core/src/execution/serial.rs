//! Serial traceroute execution.
//!
//! Probes one TTL at a time, starting at 1, so only one wait is ever active on
//! the driver's receive path.

use crate::execution::probe_hop;
use crate::{Target, TraceResult, TracerouteDriver, TracerouteError, TracerouteParams};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Executes a traceroute using serial probe sending.
///
/// The loop ends when a hop resolves to the destination address, when a hop
/// reports Destination Unreachable, when `max_hops` is exhausted, or when
/// `cancel` fires. Hops collected before a cancellation are kept.
pub async fn traceroute_serial<D: TracerouteDriver + ?Sized>(
    driver: &mut D,
    target: &Target,
    params: &TracerouteParams,
    cancel: &CancellationToken,
) -> Result<TraceResult, TracerouteError> {
    params.validate()?;

    let mut result = TraceResult::new(target.clone(), params.max_hops);

    for ttl in 1..=params.max_hops {
        if cancel.is_cancelled() {
            debug!(ttl = ttl, "Trace cancelled");
            result.mark_interrupted();
            break;
        }

        let hop = probe_hop(driver, ttl, params, cancel).await?;
        if hop.attempts() == 0 {
            result.mark_interrupted();
            break;
        }

        let reached = hop.resolved_address() == Some(target.addr);
        let unreachable = hop.unreachable().is_some();
        let complete = reached || unreachable || hop.attempts() == params.retries as usize;
        result.push_hop(hop);

        if reached {
            debug!(ttl = ttl, "Reached destination, stopping");
            result.mark_reached(ttl);
            break;
        }
        if unreachable {
            debug!(ttl = ttl, "Destination unreachable, stopping");
            break;
        }
        if !complete && cancel.is_cancelled() {
            debug!(ttl = ttl, "Trace cancelled mid-hop");
            result.mark_interrupted();
            break;
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::mock::ScriptedDriver;
    use crate::ProbeOutcome;
    use std::net::IpAddr;
    use std::time::Duration;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn params(max_hops: u8, retries: u8) -> TracerouteParams {
        TracerouteParams {
            max_hops,
            retries,
            timeout: Duration::from_millis(20),
        }
    }

    fn exceeded(addr: &str) -> ProbeOutcome {
        ProbeOutcome::TimeExceeded {
            responder: ip(addr),
            rtt: Duration::from_millis(2),
        }
    }

    #[tokio::test]
    async fn test_stops_at_destination() {
        let target = Target::new("dest", ip("192.0.2.9"));
        let mut driver = ScriptedDriver::new(target.addr)
            .reply(1, Ok(Some(exceeded("10.0.0.1"))))
            .reply(2, Ok(Some(exceeded("10.0.0.2"))))
            .reply(
                3,
                Ok(Some(ProbeOutcome::EchoReply {
                    responder: target.addr,
                    rtt: Duration::from_millis(9),
                })),
            );

        let result = traceroute_serial(&mut driver, &target, &params(30, 3), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.hops().len(), 3);
        assert_eq!(result.reached_ttl(), Some(3));
        assert_eq!(result.hop(1).unwrap().resolved_address(), Some(ip("10.0.0.1")));
        assert_eq!(result.hop(3).unwrap().resolved_address(), Some(target.addr));
        assert!(!result.interrupted());
    }

    #[tokio::test]
    async fn test_silent_hops_do_not_abort() {
        let target = Target::new("dest", ip("192.0.2.9"));
        let mut driver = ScriptedDriver::new(target.addr);

        let result = traceroute_serial(&mut driver, &target, &params(4, 2), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.hops().len(), 4);
        assert!(!result.destination_reached());
        for hop in result.hops() {
            assert_eq!(hop.attempts(), 2);
            assert!(!hop.is_resolved());
        }
        assert_eq!(driver.sent.len(), 8);
    }

    #[tokio::test]
    async fn test_unreachable_stops_without_reaching() {
        let target = Target::new("dest", ip("192.0.2.9"));
        let mut driver = ScriptedDriver::new(target.addr)
            .reply(1, Ok(Some(exceeded("10.0.0.1"))))
            .reply(
                2,
                Ok(Some(ProbeOutcome::Unreachable {
                    responder: ip("10.0.0.2"),
                    code: 1,
                    rtt: Duration::from_millis(5),
                })),
            );

        let result = traceroute_serial(&mut driver, &target, &params(10, 3), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.hops().len(), 2);
        assert!(!result.destination_reached());
        assert!(result.hop(2).unwrap().unreachable().is_some());
    }

    #[tokio::test]
    async fn test_invalid_params_rejected_before_sending() {
        let target = Target::new("dest", ip("192.0.2.9"));
        let mut driver = ScriptedDriver::new(target.addr);

        let err = traceroute_serial(&mut driver, &target, &params(0, 3), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, TracerouteError::InvalidMaxHops(0)));
        assert!(driver.sent.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_before_first_hop() {
        let target = Target::new("dest", ip("192.0.2.9"));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut driver = ScriptedDriver::new(target.addr);

        let result = traceroute_serial(&mut driver, &target, &params(5, 3), &cancel)
            .await
            .unwrap();

        assert!(result.hops().is_empty());
        assert!(result.interrupted());
        assert!(driver.sent.is_empty());
    }
}
