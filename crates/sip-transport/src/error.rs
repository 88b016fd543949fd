use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the transport layer
#[derive(Debug, Error)]
pub enum Error {
    /// Could not bind the listening socket
    #[error("Failed to bind to {0}: {1}")]
    BindFailed(SocketAddr, #[source] io::Error),

    /// A datagram could not be sent
    #[error("Failed to send to {0}: {1}")]
    SendFailed(SocketAddr, #[source] io::Error),

    /// The datagram does not fit in a single UDP packet
    #[error("Packet too large: {0} bytes (max {1})")]
    PacketTooLarge(usize, usize),

    /// The transport has been closed
    #[error("Transport is closed")]
    TransportClosed,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
