//! SIP transport layer for the siprelay proxy
//!
//! Transports here move opaque datagrams. Classifying and parsing SIP text is
//! left to the proxy core, which must be able to see (and hex dump) datagrams
//! that are not SIP at all.

mod error;
pub mod memory;
pub mod transport;
mod udp;

#[cfg(test)]
mod tests;

pub use error::{Error, Result};
pub use memory::MemoryTransport;
pub use transport::{Transport, TransportEvent};
pub use udp::UdpTransport;

/// Simplified bind function for UdpTransport
pub async fn bind_udp(
    addr: std::net::SocketAddr,
) -> Result<(UdpTransport, tokio::sync::mpsc::Receiver<TransportEvent>)> {
    UdpTransport::bind(addr, None).await
}

/// Re-export of common types for easier use
pub mod prelude {
    pub use super::{
        bind_udp, Error, MemoryTransport, Result, Transport, TransportEvent, UdpTransport,
    };
}
