//! In-process transport that captures outgoing datagrams.
//!
//! Used to drive the proxy without sockets: every `send_datagram` call is
//! recorded and can be inspected or drained afterwards.

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::transport::Transport;

/// A datagram captured by [`MemoryTransport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentDatagram {
    pub data: Bytes,
    pub destination: SocketAddr,
}

impl SentDatagram {
    /// The datagram as text, lossily decoded
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

pub struct MemoryTransport {
    local_addr: SocketAddr,
    sent: Mutex<Vec<SentDatagram>>,
    closed: AtomicBool,
}

impl MemoryTransport {
    pub fn new(local_addr: SocketAddr) -> Self {
        Self {
            local_addr,
            sent: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Everything sent so far, oldest first
    pub fn sent(&self) -> Vec<SentDatagram> {
        self.sent.lock().clone()
    }

    /// Remove and return everything sent so far
    pub fn take_sent(&self) -> Vec<SentDatagram> {
        std::mem::take(&mut *self.sent.lock())
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.local_addr)
    }

    async fn send_datagram(&self, data: &[u8], destination: SocketAddr) -> Result<()> {
        if self.is_closed() {
            return Err(Error::TransportClosed);
        }
        self.sent.lock().push(SentDatagram {
            data: Bytes::copy_from_slice(data),
            destination,
        });
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MemoryTransport({})", self.local_addr)
    }
}
