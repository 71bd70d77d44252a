//! Error types for traceroute operations.

use std::net::IpAddr;
use thiserror::Error;

/// Main error type for traceroute operations.
#[derive(Error, Debug)]
pub enum TracerouteError {
    // Resolution errors
    #[error("Failed to resolve hostname {hostname}: {reason}")]
    ResolutionFailed { hostname: String, reason: String },

    // Socket/IO errors
    #[error("Permission denied opening raw socket (run as root or grant CAP_NET_RAW): {0}")]
    PermissionDenied(#[source] std::io::Error),

    #[error("Failed to create socket: {0}")]
    SocketCreation(#[source] std::io::Error),

    #[error("Read timeout exceeded")]
    ReadTimeout,

    #[error("Read failed: {0}")]
    ReadFailed(#[source] std::io::Error),

    #[error("Write failed: {0}")]
    WriteFailed(#[source] std::io::Error),

    // Packet errors
    #[error("Address {0} cannot be used as an IPv4 destination")]
    InvalidAddress(IpAddr),

    #[error("Packet too short: expected at least {expected} bytes, got {actual}")]
    PacketTooShort { expected: usize, actual: usize },

    #[error("Failed to parse {layer} layer: {reason}")]
    PacketParseFailed { layer: &'static str, reason: String },

    #[error("Packet did not match traceroute")]
    PacketMismatch,

    // Configuration errors
    #[error("Invalid max hops: {0} (must be at least 1)")]
    InvalidMaxHops(u8),

    #[error("Invalid retry count: {0} (must be at least 1)")]
    InvalidRetries(u8),

    // Driver errors
    #[error("Probe sequence numbers exhausted")]
    SequenceExhausted,

    #[error("Raw sockets are not supported on this platform")]
    UnsupportedPlatform,

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TracerouteError {
    /// Returns true if this error is retryable (e.g., timeout, packet mismatch, parse failure).
    ///
    /// Retryable errors indicate that we should continue reading packets rather than
    /// giving up. The receive socket sees every ICMP message delivered to the host, so
    /// most of what it reads belongs to somebody else.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ReadTimeout
                | Self::PacketMismatch
                | Self::PacketParseFailed { .. }
                | Self::PacketTooShort { .. }
        )
    }

    /// Returns true if this error must abort the whole trace.
    ///
    /// Anything else raised during an attempt only costs that attempt.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ResolutionFailed { .. }
                | Self::PermissionDenied(_)
                | Self::SocketCreation(_)
                | Self::InvalidAddress(_)
                | Self::InvalidMaxHops(_)
                | Self::InvalidRetries(_)
                | Self::SequenceExhausted
                | Self::UnsupportedPlatform
        )
    }
}

impl From<std::io::Error> for TracerouteError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut => TracerouteError::ReadTimeout,
            std::io::ErrorKind::WouldBlock => TracerouteError::ReadTimeout,
            std::io::ErrorKind::PermissionDenied => TracerouteError::PermissionDenied(err),
            _ => TracerouteError::Internal(err.to_string()),
        }
    }
}

/// Result type alias for traceroute operations.
pub type TracerouteResult<T> = Result<T, TracerouteError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_retryable_errors() {
        assert!(TracerouteError::ReadTimeout.is_retryable());
        assert!(TracerouteError::PacketMismatch.is_retryable());
        assert!(TracerouteError::PacketParseFailed {
            layer: "IP",
            reason: "test".into()
        }
        .is_retryable());
        assert!(TracerouteError::PacketTooShort {
            expected: 20,
            actual: 10
        }
        .is_retryable());
        assert!(!TracerouteError::UnsupportedPlatform.is_retryable());
        assert!(!TracerouteError::WriteFailed(io::Error::from(io::ErrorKind::Other)).is_retryable());
    }

    #[test]
    fn test_fatal_errors() {
        assert!(TracerouteError::PermissionDenied(io::Error::from(io::ErrorKind::PermissionDenied))
            .is_fatal());
        assert!(TracerouteError::InvalidAddress("::1".parse().unwrap()).is_fatal());
        assert!(TracerouteError::ResolutionFailed {
            hostname: "nowhere.invalid".into(),
            reason: "not found".into()
        }
        .is_fatal());
        assert!(!TracerouteError::ReadFailed(io::Error::from(io::ErrorKind::Interrupted)).is_fatal());
        assert!(!TracerouteError::ReadTimeout.is_fatal());
    }

    #[test]
    fn test_from_io_error() {
        let err = TracerouteError::from(io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, TracerouteError::PermissionDenied(_)));

        let err = TracerouteError::from(io::Error::from(io::ErrorKind::WouldBlock));
        assert!(matches!(err, TracerouteError::ReadTimeout));

        let err = TracerouteError::from(io::Error::from(io::ErrorKind::ConnectionReset));
        assert!(matches!(err, TracerouteError::Internal(_)));
    }
}
