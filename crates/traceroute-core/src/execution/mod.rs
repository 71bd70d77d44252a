//! Execution of a trace run.
//!
//! TTLs are probed strictly in order: [`hop`] drives the attempts for a single
//! TTL, [`serial`] walks the TTLs and decides when the run is over.

pub mod hop;
pub mod serial;

pub use hop::probe_hop;
pub use serial::traceroute_serial;

#[cfg(test)]
pub(crate) mod mock;
