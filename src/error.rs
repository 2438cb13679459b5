//! Error types for the Assuan engine
//!
//! Provides a unified error type for all operations. Errors reported by a
//! peer on the wire are carried as [`WireError`] inside [`AssuanError::Peer`].

use thiserror::Error;

use crate::protocol::WireError;

/// Result type alias using AssuanError
pub type Result<T> = std::result::Result<T, AssuanError>;

/// Unified error type for Assuan operations
#[derive(Debug, Error)]
pub enum AssuanError {
    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection closed by peer")]
    ConnectionClosed,

    // -------------------------------------------------------------------------
    // Framing Errors
    // -------------------------------------------------------------------------
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Line too long: {len} bytes (max {max})")]
    LineTooLong { len: usize, max: usize },

    #[error("Invalid verb: {0:?}")]
    InvalidVerb(String),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Peer error: {0}")]
    Peer(#[from] WireError),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Missing data with keyword {0}")]
    MissingInquireData(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AssuanError {
    /// True when the error means the other side went away rather than
    /// something being wrong with the exchange itself.
    pub fn is_disconnect(&self) -> bool {
        match self {
            AssuanError::ConnectionClosed => true,
            AssuanError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }

    /// The structured peer error, if this is one.
    pub fn as_peer(&self) -> Option<&WireError> {
        match self {
            AssuanError::Peer(e) => Some(e),
            _ => None,
        }
    }
}
