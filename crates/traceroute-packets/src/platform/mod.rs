//! Platform-specific packet I/O implementations.

#[cfg(unix)]
pub mod unix;

use crate::SourceSinkHandle;
use traceroute_core::TracerouteError;

/// Opens a Source and Sink appropriate for the current platform.
pub fn new_source_sink() -> Result<SourceSinkHandle, TracerouteError> {
    #[cfg(unix)]
    return unix::new_source_sink();

    #[cfg(not(unix))]
    return Err(TracerouteError::UnsupportedPlatform);
}
