//! Error types for the `sse` crate.
//!
//! Follows the same pattern as the other layers: a root `Error` struct holding
//! an error kind and an optional source for error chaining.

use std::error::Error as StdError;
use std::fmt;

/// Top-level error type for the `sse` crate.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Major categories of errors raised by a streaming client.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    /// The connection lacks a capability streaming depends on. No client is created.
    UnsupportedTransport(TransportErrorKind),
    /// The client has terminated; the event was not accepted.
    ClientClosed,
}

/// The missing transport capability.
#[derive(Debug, PartialEq)]
pub enum TransportErrorKind {
    Flush,
    CloseNotify,
}

impl Error {
    pub fn is_client_closed(&self) -> bool {
        self.error_kind == ErrorKind::ClientClosed
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::UnsupportedTransport(TransportErrorKind::Flush) => {
                write!(f, "Unsupported transport: streaming not supported")
            }
            ErrorKind::UnsupportedTransport(TransportErrorKind::CloseNotify) => {
                write!(f, "Unsupported transport: unable to start close handler")
            }
            ErrorKind::ClientClosed => write!(f, "Message sent on closed client"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

/// Helper function to create unsupported transport errors.
pub fn unsupported_transport(kind: TransportErrorKind) -> Error {
    Error {
        source: None,
        error_kind: ErrorKind::UnsupportedTransport(kind),
    }
}

/// Helper function to create closed client errors.
pub fn client_closed() -> Error {
    Error {
        source: None,
        error_kind: ErrorKind::ClientClosed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_the_missing_capability() {
        assert_eq!(
            unsupported_transport(TransportErrorKind::Flush).to_string(),
            "Unsupported transport: streaming not supported"
        );
        assert_eq!(
            unsupported_transport(TransportErrorKind::CloseNotify).to_string(),
            "Unsupported transport: unable to start close handler"
        );
    }

    #[test]
    fn test_client_closed_is_distinguishable() {
        assert!(client_closed().is_client_closed());
        assert!(!unsupported_transport(TransportErrorKind::Flush).is_client_closed());
    }
}
