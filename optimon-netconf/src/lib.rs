//! NETCONF discovery and metric collection for optical transport devices.
//!
//! One process invocation connects to one device, issues a single
//! subtree-filtered `<get>`, and resolves every instance and metric from
//! the response. Vendors disagree about namespace declarations, so element
//! resolution runs a three-tier fallback chain ([`xpath`]).
//!
//! Discovery lines and collection lines go to stdout; diagnostics stay on
//! stderr.

pub mod client;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod xpath;

pub use client::NetconfClient;
pub use config::NetconfCollectorConfig;
pub use error::{NetconfError, Result};
