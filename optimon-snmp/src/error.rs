//! Error types for the SNMP collector.

use thiserror::Error;

/// Errors that abort an SNMP collection run.
///
/// Everything below the connection layer recovers locally: unmatched
/// classifier rules, undecodable indices and missing branch rows all
/// degrade to "unknown" data rather than errors.
#[derive(Debug, Error)]
pub enum SnmpError {
    /// Device unreachable, session setup failed, or a request timed out.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The device or configuration produced an unusable request/response.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Configuration rejected at load time.
    #[error("Configuration error: {0}")]
    Config(String),
}
