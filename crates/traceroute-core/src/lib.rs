//! Core types, traits, and error handling for ICMP traceroute.
//!
//! This crate provides the fundamental abstractions used throughout the
//! traceroute implementation:
//!
//! - [`TracerouteDriver`] trait for probe transports
//! - [`ProbeOutcome`], [`HopRecord`], and [`TraceResult`] for the data model
//! - [`TracerouteError`] for error handling
//! - [`execution`] for the per-hop state machine and the TTL loop

pub mod error;
pub mod execution;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{TracerouteError, TracerouteResult};
pub use result::{HopRecord, TraceResult};
pub use traits::{Resolve, TracerouteDriver};
pub use types::{
    unreachable_annotation, Probe, ProbeOutcome, Target, TracerouteConfig, TracerouteParams,
};
