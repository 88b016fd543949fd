//! Receive loop glue between a transport and the dispatcher

use std::net::SocketAddr;
use std::sync::Arc;

use siprelay_registrar_core::RegistrarStore;
use siprelay_sip_transport::{Transport, TransportEvent, UdpTransport};
use tokio::sync::mpsc;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::config::ProxyConfig;
use crate::dispatcher::{DispatchOutcome, Dispatcher};
use crate::error::Result;

/// A proxy bound to one transport
pub struct ProxyServer {
    dispatcher: Arc<Dispatcher>,
    transport: Arc<dyn Transport>,
}

impl ProxyServer {
    pub fn new(dispatcher: Arc<Dispatcher>, transport: Arc<dyn Transport>) -> Self {
        Self {
            dispatcher,
            transport,
        }
    }

    /// Bind the UDP transport and build a dispatcher with an empty registrar
    pub async fn bind(config: &ProxyConfig) -> Result<(Self, mpsc::Receiver<TransportEvent>)> {
        let identity = config.identity()?;
        let (transport, events) =
            UdpTransport::bind(config.bind_addr, Some(config.channel_capacity)).await?;
        info!("Proxy advertised as {}", identity.addr());

        let dispatcher = Dispatcher::with_options(
            Arc::new(RegistrarStore::new()),
            identity,
            config.dispatch_options(),
        );
        Ok((Self::new(Arc::new(dispatcher), Arc::new(transport)), events))
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.transport.local_addr()?)
    }

    /// Process transport events until the transport closes.
    ///
    /// Each datagram is handled on its own task; the registrar is the only
    /// state those tasks share.
    pub async fn run(&self, mut events: mpsc::Receiver<TransportEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                TransportEvent::DatagramReceived { data, source, .. } => {
                    let dispatcher = self.dispatcher.clone();
                    let transport = self.transport.clone();
                    let span = info_span!("datagram", %source, len = data.len());

                    tokio::spawn(
                        async move {
                            match dispatcher.handle_datagram(&data, source, transport).await {
                                Ok(DispatchOutcome::Dropped(reason)) => {
                                    debug!("Dropped: {}", reason)
                                }
                                Ok(outcome) => debug!("Outcome: {:?}", outcome),
                                Err(e) => error!("Failed to handle datagram: {}", e),
                            }
                        }
                        .instrument(span),
                    );
                }
                TransportEvent::Error { error } => warn!("Transport error: {}", error),
                TransportEvent::Closed => {
                    info!("Transport closed, stopping proxy");
                    break;
                }
            }
        }
    }

    pub async fn shutdown(&self) -> Result<()> {
        Ok(self.transport.close().await?)
    }
}
