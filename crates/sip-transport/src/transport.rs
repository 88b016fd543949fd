use std::fmt;
use std::net::SocketAddr;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// A datagram transport the proxy can receive on and send through.
///
/// Bindings in the registrar keep an `Arc<dyn Transport>` so that traffic for
/// a registered party always leaves through the transport it registered on.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Local address this transport is bound to
    fn local_addr(&self) -> Result<SocketAddr>;

    /// Send one datagram to `destination`
    async fn send_datagram(&self, data: &[u8], destination: SocketAddr) -> Result<()>;

    /// Stop the transport; pending receives end with `TransportEvent::Closed`
    async fn close(&self) -> Result<()>;

    fn is_closed(&self) -> bool;
}

/// Events emitted by a transport's receive loop
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A datagram arrived
    DatagramReceived {
        /// Raw datagram contents
        data: Bytes,
        /// Address the datagram came from
        source: SocketAddr,
        /// Local address it arrived on
        destination: SocketAddr,
    },

    /// Error while receiving
    Error {
        error: String,
    },

    /// The transport was closed
    Closed,
}
