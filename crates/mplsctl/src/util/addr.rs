//! Address literal parsing.

use std::net::Ipv4Addr;

/// Error type for address parsing.
#[derive(Debug, thiserror::Error)]
pub enum AddrError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

pub type Result<T> = std::result::Result<T, AddrError>;

/// Parse a dotted-quad IPv4 address.
///
/// Surrounding whitespace, prefix lengths and IPv6 literals are rejected.
pub fn parse_ipv4(s: &str) -> Result<Ipv4Addr> {
    s.parse()
        .map_err(|_| AddrError::InvalidAddress(s.to_string()))
}
