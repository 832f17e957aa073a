//! Error types for the threatgate library.
//!
//! This module provides structured, typed errors for all failure scenarios.
//! The library never panics; all errors are returned as `Result` values.

use std::time::Duration;
use thiserror::Error;

/// The main error type for scan and signature operations.
///
/// Variants are grouped by who caused the failure: input errors are
/// caller-caused and never retried, transport errors may trigger a one-time
/// fallback to the local-process transport, and persistence errors are
/// surfaced distinctly so callers know the scan itself succeeded.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The file exceeds the maximum allowed size.
    ///
    /// Rejected before any spool I/O happens.
    #[error("file size {size} bytes exceeds maximum {max} bytes")]
    FileTooLarge {
        /// Declared or observed file size in bytes.
        size: u64,
        /// Maximum allowed size in bytes.
        max: u64,
    },

    /// The byte source could not be read, or the spool could not be written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The scanning daemon refused or dropped the connection.
    ///
    /// This is the one transport failure that triggers the local-process
    /// fallback for the current call when fallback is configured.
    #[error("connection to scanning daemon refused: {message}")]
    ConnectionRefused {
        /// Error message describing the failure.
        message: String,
    },

    /// A transport operation exceeded its time budget.
    ///
    /// The abort is purely client-side; the engine is never blocked on.
    #[error("scan operation timed out after {elapsed:?}")]
    Timeout {
        /// The budget that was exhausted.
        elapsed: Duration,
    },

    /// The daemon returned a response outside the OK/FOUND grammar.
    #[error("protocol violation from scanning daemon: {details}")]
    Protocol {
        /// Details about the malformed response.
        details: String,
    },

    /// The local scanner process failed for a reason other than a valid
    /// threat-found exit.
    #[error("scanner process failed (exit status {status:?}): {message}")]
    Execution {
        /// Description of the failure, typically the tail of the output.
        message: String,
        /// Exit status code, if the process exited at all.
        status: Option<i32>,
    },

    /// The engine could not be queried for its signature-database identity.
    #[error("scanning engine unavailable: {reason}")]
    EngineUnavailable {
        /// Human-readable reason for unavailability.
        reason: String,
    },

    /// A signature update cycle is already in flight.
    #[error("a signature update is already in progress")]
    UpdateInProgress,

    /// The recorder failed after a verdict was already computed.
    ///
    /// Distinct from scan failure: the scan itself succeeded.
    #[error("failed to persist record: {message}")]
    Persistence {
        /// Description of the recorder failure.
        message: String,
    },

    /// Invalid configuration or wiring.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },
}

impl ScanError {
    /// Returns `true` if this error was caused by the caller's input
    /// (4xx-equivalent, never retried automatically).
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::FileTooLarge { .. })
    }

    /// Returns `true` if this error should trigger the one-time switch to
    /// the local-process fallback transport.
    pub fn triggers_fallback(&self) -> bool {
        matches!(self, Self::ConnectionRefused { .. })
    }

    /// Returns `true` if the scan itself completed and only persistence
    /// failed afterwards.
    pub fn is_persistence_error(&self) -> bool {
        matches!(self, Self::Persistence { .. })
    }

    /// Creates a `ConnectionRefused` error.
    pub fn connection_refused(message: impl Into<String>) -> Self {
        Self::ConnectionRefused {
            message: message.into(),
        }
    }

    /// Creates a `Timeout` error.
    pub fn timeout(elapsed: Duration) -> Self {
        Self::Timeout { elapsed }
    }

    /// Creates a `Protocol` error.
    pub fn protocol(details: impl Into<String>) -> Self {
        Self::Protocol {
            details: details.into(),
        }
    }

    /// Creates an `Execution` error.
    pub fn execution(message: impl Into<String>, status: Option<i32>) -> Self {
        Self::Execution {
            message: message.into(),
            status,
        }
    }

    /// Creates an `EngineUnavailable` error.
    pub fn engine_unavailable(reason: impl Into<String>) -> Self {
        Self::EngineUnavailable {
            reason: reason.into(),
        }
    }

    /// Creates a `Persistence` error.
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    /// Creates a `Configuration` error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Classifies a connect-phase I/O error.
    ///
    /// Refused connections and missing sockets both mean "daemon
    /// unreachable" and are eligible for fallback.
    pub(crate) fn from_connect_error(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::ConnectionRefused | ErrorKind::NotFound | ErrorKind::ConnectionReset => {
                Self::ConnectionRefused {
                    message: err.to_string(),
                }
            }
            ErrorKind::TimedOut => Self::Timeout {
                elapsed: Duration::ZERO,
            },
            _ => Self::Io(err),
        }
    }
}

/// A specialized `Result` type for scan operations.
pub type Result<T> = std::result::Result<T, ScanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_error_classification() {
        let too_large = ScanError::FileTooLarge {
            size: 100_000_000,
            max: 50_000_000,
        };
        assert!(too_large.is_input_error());
        assert!(!too_large.triggers_fallback());

        let refused = ScanError::connection_refused("no route to daemon");
        assert!(refused.triggers_fallback());
        assert!(!refused.is_input_error());
    }

    #[test]
    fn persistence_is_distinct_from_scan_failure() {
        let err = ScanError::persistence("recorder offline");
        assert!(err.is_persistence_error());
        assert!(!err.triggers_fallback());
    }

    #[test]
    fn connect_error_mapping() {
        let refused = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert!(matches!(
            ScanError::from_connect_error(refused),
            ScanError::ConnectionRefused { .. }
        ));

        let missing = std::io::Error::new(std::io::ErrorKind::NotFound, "no socket");
        assert!(matches!(
            ScanError::from_connect_error(missing),
            ScanError::ConnectionRefused { .. }
        ));

        let other = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(matches!(
            ScanError::from_connect_error(other),
            ScanError::Io(_)
        ));
    }

    #[test]
    fn display_includes_sizes() {
        let err = ScanError::FileTooLarge { size: 123, max: 50 };
        let text = err.to_string();
        assert!(text.contains("123"));
        assert!(text.contains("50"));
    }
}
