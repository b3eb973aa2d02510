//! Error types for the ingestion layer.
//!
//! All errors implement [`std::error::Error`] with source chaining and carry
//! enough context to tell which input or address was involved. Dropped
//! messages (malformed frames, failed signatures, unroutable encodings) are
//! deliberately *not* errors: they are logged and swallowed on the hot path
//! so a hostile peer cannot crash or stall an input.

use std::io;
use thiserror::Error;

/// Result type alias for ingestion operations.
pub type Result<T, E = IntakeError> = std::result::Result<T, E>;

/// Main error type for ingestion operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum IntakeError {
    #[error("failed to resolve address '{address}'")]
    Resolve {
        address: String,
        #[source]
        source: Option<io::Error>,
    },

    #[error("failed to bind {address}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("accept loop terminated")]
    Accept {
        #[source]
        source: io::Error,
    },

    #[error("malformed frame: {reason}")]
    Frame { reason: String },

    #[error("header serialization failed")]
    Header {
        #[source]
        source: bincode::Error,
    },

    #[error("invalid configuration: {reason}")]
    Config { reason: String },

    #[error("I/O error")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl IntakeError {
    /// Returns whether retrying the failed operation could plausibly succeed.
    ///
    /// Bind, configuration, and framing failures are deterministic; name
    /// resolution and generic I/O may be transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            IntakeError::Resolve { .. } => true,
            IntakeError::Io { .. } => true,
            IntakeError::Bind { .. } => false,
            IntakeError::Accept { .. } => false,
            IntakeError::Frame { .. } => false,
            IntakeError::Header { .. } => false,
            IntakeError::Config { .. } => false,
        }
    }

    /// Helper constructor for resolution failures.
    pub fn resolve(address: impl Into<String>, source: Option<io::Error>) -> Self {
        IntakeError::Resolve { address: address.into(), source }
    }

    /// Helper constructor for bind failures.
    pub fn bind(address: impl Into<String>, source: io::Error) -> Self {
        IntakeError::Bind { address: address.into(), source }
    }

    /// Helper constructor for a non-transient accept failure.
    pub fn accept(source: io::Error) -> Self {
        IntakeError::Accept { source }
    }

    /// Helper constructor for frame encoding failures.
    pub fn frame(reason: impl Into<String>) -> Self {
        IntakeError::Frame { reason: reason.into() }
    }

    /// Helper constructor for configuration failures.
    pub fn config(reason: impl Into<String>) -> Self {
        IntakeError::Config { reason: reason.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_carry_context() {
        let err = IntakeError::bind("127.0.0.1:5565", io::Error::from(io::ErrorKind::AddrInUse));
        assert!(err.to_string().contains("127.0.0.1:5565"));

        let err = IntakeError::resolve("ingest.internal:5565", None);
        assert!(err.to_string().contains("ingest.internal:5565"));

        let err = IntakeError::frame("declared length exceeds maximum");
        assert!(err.to_string().contains("declared length exceeds maximum"));
    }

    #[test]
    fn retryability_classification() {
        assert!(IntakeError::resolve("host:1", None).is_retryable());
        assert!(IntakeError::from(io::Error::from(io::ErrorKind::Interrupted)).is_retryable());
        assert!(!IntakeError::config("bad").is_retryable());
        assert!(!IntakeError::bind("x", io::Error::from(io::ErrorKind::AddrInUse)).is_retryable());
    }

    #[test]
    fn source_chain_is_preserved() {
        let err = IntakeError::bind("x", io::Error::new(io::ErrorKind::AddrInUse, "in use"));
        let source = std::error::Error::source(&err).expect("bind error has a source");
        assert_eq!(source.to_string(), "in use");
    }

    #[test]
    fn error_is_send_sync_static() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<IntakeError>();
    }
}
