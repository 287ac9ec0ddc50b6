//! Error types for the NETCONF collector.
//!
//! Only broken connectivity and protocol-level rejection are errors here.
//! Empty query results, unresolvable identities and unparseable metric
//! values all recover locally inside the pipeline.

use std::time::Duration;

use thiserror::Error;

/// Result type alias using [`NetconfError`].
pub type Result<T> = std::result::Result<T, NetconfError>;

/// Errors that abort a NETCONF collection run.
#[derive(Debug, Error)]
pub enum NetconfError {
    /// Host unreachable or the SSH session could not be established.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The device rejected our credentials.
    #[error("Authentication failed for user '{user}'")]
    Auth { user: String },

    /// Malformed filter, RPC error reply, or an unparseable response.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Configuration rejected at load time.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A bounded network operation did not complete in time.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// I/O error on the transport.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ssh2::Error> for NetconfError {
    fn from(err: ssh2::Error) -> Self {
        Self::Connection(err.to_string())
    }
}
