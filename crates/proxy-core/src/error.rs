//! Error types for proxy-core

use std::net::IpAddr;
use thiserror::Error;

/// Result type for proxy operations
pub type Result<T> = std::result::Result<T, ProxyError>;

/// Errors raised while processing one datagram, plus setup errors.
///
/// Processing errors never outlive their datagram: the dispatcher turns them
/// into a local response or a silent drop.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// First line is neither a request-line nor a status-line
    #[error("Malformed datagram ({len} bytes)")]
    MalformedDatagram { len: usize },

    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    /// The From address-of-record is missing or not registered
    #[error("Origin not registered: {0}")]
    UnregisteredOrigin(String),

    /// The To address-of-record is not registered or its binding expired
    #[error("Destination not registered or expired: {0}")]
    UnregisteredOrExpiredDestination(String),

    /// The To header is missing or has no `sip:user@host`
    #[error("No destination could be parsed from the To header")]
    NoDestinationParsed,

    /// The client address is refused by the source address policy
    #[error("Source address denied by policy: {0}")]
    SourceDenied(IpAddr),

    #[error("Transport error: {0}")]
    Transport(#[from] siprelay_sip_transport::Error),

    #[error(transparent)]
    Infra(#[from] siprelay_infra_common::Error),
}
