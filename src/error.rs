//! Error types for the control channel.
//!
//! CHANGELOG:
//! - 10/19/2026 - Initial implementation

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised inside the control channel.
///
/// None of these escape the control boundary: the resolver turns them into an
/// absent endpoint, the server logs them, and the client maps them to LSB codes.
#[derive(Error, Debug)]
pub enum ControlError {
    #[error("Cannot parse port number from '{spec}'")]
    InvalidPort { spec: String },

    #[error("Unknown host in '{spec}'")]
    UnknownHost { spec: String },

    #[error("No socket address to listen to")]
    NoEndpoint,

    #[error("Failed to bind control listener to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("Port record {path:?}: {source}")]
    Store {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Connection failed: {0}")]
    Io(#[from] io::Error),

    #[error("Connection closed before a line was received")]
    EmptyResponse,

    #[error("Line exceeds {limit} bytes")]
    LineTooLong { limit: usize },
}

impl ControlError {
    /// True when the peer actively refused the connection (nothing listening).
    pub fn is_refused(&self) -> bool {
        matches!(self, ControlError::Io(e) if e.kind() == io::ErrorKind::ConnectionRefused)
    }
}

pub type Result<T> = std::result::Result<T, ControlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refused_detection() {
        let refused = ControlError::from(io::Error::from(io::ErrorKind::ConnectionRefused));
        assert!(refused.is_refused());

        let reset = ControlError::from(io::Error::from(io::ErrorKind::ConnectionReset));
        assert!(!reset.is_refused());
        assert!(!ControlError::EmptyResponse.is_refused());
    }

    #[test]
    fn test_messages_name_the_input() {
        let err = ControlError::InvalidPort { spec: "localhost:abc".to_string() };
        assert_eq!(err.to_string(), "Cannot parse port number from 'localhost:abc'");
    }
}
