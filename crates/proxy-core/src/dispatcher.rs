//! Per-datagram request/response dispatch
//!
//! The dispatcher is stateless across datagrams; everything it remembers
//! lives in the shared [`RegistrarStore`].

use std::net::SocketAddr;
use std::sync::Arc;

use siprelay_registrar_core::{Binding, RegistrarStore};
use siprelay_sip_transport::Transport;
use tracing::{debug, error, info, warn};

use crate::diagnostics;
use crate::error::{ProxyError, Result};
use crate::header::{self, HeaderKind};
use crate::identity::ProxyIdentity;
use crate::message::{Method, SipMessage, StartLine};
use crate::policy::AddressPolicy;
use crate::response::{build_response, StatusCode, TagPolicy};
use crate::routing;

/// Default suffix appended to the branch of a Via pushed by the proxy
pub const DEFAULT_BRANCH_SUFFIX: &str = "m";

/// Tunables for message handling
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    /// Appended to the client's branch to form the proxy's own branch
    pub branch_suffix: String,
    /// To tag used in local responses
    pub tags: TagPolicy,
    /// Replace a registered AOR in the Request-URI with its contact
    pub rewrite_request_uri: bool,
    /// Which clients may REGISTER
    pub address_policy: AddressPolicy,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            branch_suffix: DEFAULT_BRANCH_SUFFIX.to_string(),
            tags: TagPolicy::default(),
            rewrite_request_uri: false,
            address_policy: AddressPolicy::default(),
        }
    }
}

/// One datagram being processed
#[derive(Debug, Clone)]
pub struct RoutingContext {
    pub message: SipMessage,
    /// Where the datagram came from
    pub client_addr: SocketAddr,
    /// Transport that received it; local responses go back through it
    pub transport: Arc<dyn Transport>,
}

/// What happened to a datagram
#[derive(Debug)]
pub enum DispatchOutcome {
    /// A local response was sent back to the client
    Responded(StatusCode),
    /// A local error response was sent back to the client
    Rejected { status: StatusCode, reason: ProxyError },
    /// The message was forwarded
    Forwarded { aor: String, destination: SocketAddr },
    /// Nothing was sent
    Dropped(ProxyError),
}

pub struct Dispatcher {
    registrar: Arc<RegistrarStore>,
    identity: ProxyIdentity,
    options: DispatchOptions,
}

impl Dispatcher {
    pub fn new(registrar: Arc<RegistrarStore>, identity: ProxyIdentity) -> Self {
        Self::with_options(registrar, identity, DispatchOptions::default())
    }

    pub fn with_options(
        registrar: Arc<RegistrarStore>,
        identity: ProxyIdentity,
        options: DispatchOptions,
    ) -> Self {
        Self {
            registrar,
            identity,
            options,
        }
    }

    pub fn registrar(&self) -> &Arc<RegistrarStore> {
        &self.registrar
    }

    pub fn identity(&self) -> &ProxyIdentity {
        &self.identity
    }

    /// Classify a raw datagram and dispatch it.
    ///
    /// Only a failed send is returned as an error; every protocol problem is
    /// reported through the outcome.
    pub async fn handle_datagram(
        &self,
        data: &[u8],
        client_addr: SocketAddr,
        transport: Arc<dyn Transport>,
    ) -> Result<DispatchOutcome> {
        let message = match SipMessage::parse(data) {
            Ok(message) => message,
            Err(e) => {
                diagnostics::report_unrecognized(data);
                return Ok(DispatchOutcome::Dropped(e));
            }
        };

        info!("> request > {}", message.first_line());
        debug!("---\n>> server received [{}]:\n{}\n---", data.len(), message);
        debug!("Received from {}", client_addr);

        self.dispatch(RoutingContext {
            message,
            client_addr,
            transport,
        })
        .await
    }

    pub async fn dispatch(&self, ctx: RoutingContext) -> Result<DispatchOutcome> {
        let method = match ctx.message.start_line() {
            Some(StartLine::Request { method, .. }) => method,
            Some(StartLine::Status { .. }) => return self.process_response(ctx).await,
            None => {
                let len = ctx.message.to_bytes().len();
                return Ok(DispatchOutcome::Dropped(ProxyError::MalformedDatagram { len }));
            }
        };

        match method {
            Method::Register => self.process_register(ctx).await,
            Method::Invite => {
                self.process_dialog_request(ctx, StatusCode::TemporarilyUnavailable).await
            }
            Method::Ack => self.process_ack(ctx).await,
            Method::Bye
            | Method::Cancel
            | Method::Options
            | Method::Info
            | Method::Message
            | Method::Refer
            | Method::Prack
            | Method::Update => self.process_dialog_request(ctx, StatusCode::NotAcceptable).await,
            Method::Subscribe | Method::Publish | Method::Notify => {
                self.respond(&ctx, StatusCode::Ok).await?;
                Ok(DispatchOutcome::Responded(StatusCode::Ok))
            }
            Method::Other(token) => {
                error!("request_uri {}", ctx.message.first_line());
                Ok(DispatchOutcome::Dropped(ProxyError::UnknownMethod(token)))
            }
        }
    }

    async fn process_register(&self, ctx: RoutingContext) -> Result<DispatchOutcome> {
        let source_ip = ctx.client_addr.ip();
        if !self.options.address_policy.permits(source_ip) {
            warn!("REGISTER from {} refused by address policy", source_ip);
            return self
                .reject(&ctx, StatusCode::Forbidden, ProxyError::SourceDenied(source_ip))
                .await;
        }

        let headers = ctx.message.header_lines();
        let aor = header::address_of_record(headers, HeaderKind::To);
        let contact = header::contact(headers).unwrap_or_default();
        let expires = header::effective_expiry(contact.expires, header::expires_header(headers));

        match aor {
            Some(aor) => {
                info!("[ CALLER response ] account: {} (located at {})", aor, contact.address);
                debug!("Client address: {}", ctx.client_addr);
                debug!("Expires= {}", expires);

                self.registrar.upsert(
                    &aor,
                    &contact.address,
                    ctx.transport.clone(),
                    ctx.client_addr,
                    expires,
                );
                self.dump_registrar();
            }
            None => warn!("REGISTER without a sip: address in To, nothing stored"),
        }

        self.respond(&ctx, StatusCode::Ok).await?;
        Ok(DispatchOutcome::Responded(StatusCode::Ok))
    }

    /// INVITE and the non-INVITE methods that need both parties registered.
    /// `unavailable` is the status sent when the destination is unknown or
    /// expired.
    async fn process_dialog_request(
        &self,
        ctx: RoutingContext,
        unavailable: StatusCode,
    ) -> Result<DispatchOutcome> {
        debug!("{} received", ctx.message.first_line());

        match self.resolve_dialog_destination(&ctx.message) {
            Ok((aor, binding)) => self.forward_request(ctx, aor, binding).await,
            Err(reason) => {
                let status = match reason {
                    ProxyError::UnregisteredOrigin(_) => StatusCode::BadRequest,
                    ProxyError::NoDestinationParsed => StatusCode::ServerInternalError,
                    _ => unavailable,
                };
                self.reject(&ctx, status, reason).await
            }
        }
    }

    fn resolve_dialog_destination(
        &self,
        message: &SipMessage,
    ) -> std::result::Result<(String, Binding), ProxyError> {
        let headers = message.header_lines();

        let origin = header::address_of_record(headers, HeaderKind::From)
            .ok_or_else(|| ProxyError::UnregisteredOrigin(String::new()))?;
        if !self.registrar.contains(&origin) {
            return Err(ProxyError::UnregisteredOrigin(origin));
        }

        let destination = header::address_of_record(headers, HeaderKind::To)
            .ok_or(ProxyError::NoDestinationParsed)?;
        info!("[ recipient ] {}", destination);

        match self.registrar.valid_binding(&destination) {
            Ok(binding) => Ok((destination, binding)),
            Err(_) => Err(ProxyError::UnregisteredOrExpiredDestination(destination)),
        }
    }

    /// ACK never gets a response; an unknown destination just drops it
    async fn process_ack(&self, ctx: RoutingContext) -> Result<DispatchOutcome> {
        debug!("ACK received");

        let headers = ctx.message.header_lines();
        let destination = match header::address_of_record(headers, HeaderKind::To) {
            Some(destination) => destination,
            None => return Ok(DispatchOutcome::Dropped(ProxyError::NoDestinationParsed)),
        };
        info!("[ recipient ] {}", destination);

        match self.registrar.lookup(&destination) {
            Some(binding) => self.forward_request(ctx, destination, binding).await,
            None => Ok(DispatchOutcome::Dropped(
                ProxyError::UnregisteredOrExpiredDestination(destination),
            )),
        }
    }

    /// Responses travel back to the party named in From
    async fn process_response(&self, ctx: RoutingContext) -> Result<DispatchOutcome> {
        let headers = ctx.message.header_lines();
        let origin = match header::address_of_record(headers, HeaderKind::From) {
            Some(origin) => origin,
            None => {
                let reason = ProxyError::UnregisteredOrigin(String::new());
                return Ok(DispatchOutcome::Dropped(reason));
            }
        };
        debug!("origin {}", origin);

        let binding = match self.registrar.lookup(&origin) {
            Some(binding) => binding,
            None => return Ok(DispatchOutcome::Dropped(ProxyError::UnregisteredOrigin(origin))),
        };

        let mut message = ctx.message;
        routing::remove_route(&mut message);
        routing::remove_top_via(&mut message, &self.identity);

        self.send(&binding, &message).await?;
        Ok(DispatchOutcome::Forwarded {
            aor: origin,
            destination: binding.client_addr,
        })
    }

    async fn forward_request(
        &self,
        ctx: RoutingContext,
        aor: String,
        binding: Binding,
    ) -> Result<DispatchOutcome> {
        let mut message = ctx.message;

        routing::add_top_via(
            &mut message,
            &self.identity,
            ctx.client_addr,
            &self.options.branch_suffix,
        );
        if self.options.rewrite_request_uri {
            self.rewrite_request_uri(&mut message);
        }
        routing::remove_route(&mut message);
        routing::insert_record_route(&mut message, &self.identity);

        self.send(&binding, &message).await?;
        Ok(DispatchOutcome::Forwarded {
            aor,
            destination: binding.client_addr,
        })
    }

    /// Point the Request-URI at the registered contact of the AOR it names
    fn rewrite_request_uri(&self, message: &mut SipMessage) {
        if let Some(StartLine::Request { method, uri }) = message.start_line() {
            if let Some(binding) = self.registrar.lookup(&uri) {
                message.set_first_line(format!("{} sip:{} SIP/2.0", method, binding.contact));
            }
        }
    }

    async fn send(&self, binding: &Binding, message: &SipMessage) -> Result<()> {
        let data = message.to_bytes();
        binding
            .transport
            .send_datagram(&data, binding.client_addr)
            .await?;

        info!("< msg < {}", message.first_line());
        debug!("---\n<< server send [{}]:\n{}\n---", data.len(), message);
        Ok(())
    }

    async fn reject(
        &self,
        ctx: &RoutingContext,
        status: StatusCode,
        reason: ProxyError,
    ) -> Result<DispatchOutcome> {
        debug!("Rejecting {}: {}", ctx.message.first_line(), reason);
        self.respond(ctx, status).await?;
        Ok(DispatchOutcome::Rejected { status, reason })
    }

    async fn respond(&self, ctx: &RoutingContext, status: StatusCode) -> Result<()> {
        let text = build_response(status, &ctx.message, ctx.client_addr, &self.options.tags);
        ctx.transport
            .send_datagram(text.as_bytes(), ctx.client_addr)
            .await?;

        info!("[ PROXY response ] --- {}", status.status_line());
        debug!("---\n<< server send [{}]:\n{}\n---", text.len(), text);
        Ok(())
    }

    fn dump_registrar(&self) {
        debug!("*** REGISTRAR ***");
        for (aor, contact) in self.registrar.snapshot() {
            debug!("{} -> {}", aor, contact);
        }
        debug!("*****************");
    }
}
