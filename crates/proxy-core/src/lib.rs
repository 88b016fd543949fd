//! # siprelay proxy core
//!
//! Message processing for a minimal SIP proxy and registrar over UDP.
//!
//! A datagram goes through these stages:
//!
//! 1. [`message`] splits it into CRLF lines and classifies the first line as a
//!    request-line or a status-line. Anything else is dropped (and hex dumped
//!    by [`diagnostics`]).
//! 2. [`dispatcher`] picks a handler by method or by status-line.
//! 3. Handlers read and update the shared registrar, using the extractors in
//!    [`header`] to find the address-of-record, contact and expiry.
//! 4. Forwarded messages are rewritten by [`routing`] (Via push/pop, Route
//!    stripping, Record-Route insertion); local replies are built by
//!    [`response`].
//!
//! [`server`] connects a transport's receive loop to the dispatcher, one task
//! per datagram.

pub mod config;
pub mod diagnostics;
pub mod dispatcher;
pub mod error;
pub mod header;
pub mod identity;
pub mod message;
pub mod policy;
pub mod response;
pub mod routing;
pub mod server;

pub use config::ProxyConfig;
pub use dispatcher::{DispatchOptions, DispatchOutcome, Dispatcher, RoutingContext};
pub use error::{ProxyError, Result};
pub use identity::ProxyIdentity;
pub use message::{Method, SipMessage, StartLine};
pub use response::{StatusCode, TagPolicy};
pub use server::ProxyServer;

/// Re-export of common types for easier use
pub mod prelude {
    pub use crate::{
        DispatchOptions, DispatchOutcome, Dispatcher, Method, ProxyConfig, ProxyError,
        ProxyIdentity, ProxyServer, Result, RoutingContext, SipMessage, StartLine, StatusCode,
        TagPolicy,
    };
    pub use siprelay_registrar_core::RegistrarStore;
}
