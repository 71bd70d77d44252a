//! ICMP echo traceroute implementation.

mod classify;
mod driver;
mod packet;
mod trace;

pub use classify::{classify, Classification};
pub use driver::IcmpDriver;
pub use packet::{build_echo_request, ECHO_PAYLOAD};
pub use trace::{local_addr_for, resolve_target, trace, trace_with};
