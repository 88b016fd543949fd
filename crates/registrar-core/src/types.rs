//! Core registrar types

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use siprelay_sip_transport::Transport;

/// Where an address-of-record currently answers
#[derive(Debug, Clone)]
pub struct Binding {
    /// Contact address from the REGISTER (e.g. `alice@192.168.1.5:5060`)
    pub contact: String,

    /// Transport the REGISTER arrived on; traffic for this binding leaves through it
    pub transport: Arc<dyn Transport>,

    /// Source address the REGISTER was received from
    pub client_addr: SocketAddr,

    /// When this binding stops being valid
    pub expires_at: DateTime<Utc>,
}

impl Binding {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Result of a REGISTER applied to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// A binding was created or replaced
    Registered { expires_at: DateTime<Utc> },
    /// Expiry was zero; `removed` tells whether a binding existed
    Unregistered { removed: bool },
}
