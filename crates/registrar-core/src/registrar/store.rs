//! Thread-safe binding table

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use siprelay_sip_transport::Transport;
use tracing::{debug, info, warn};

use crate::error::{RegistrarError, Result};
use crate::types::{Binding, UpsertOutcome};

/// Address-of-record to binding table.
///
/// Each operation on one AOR runs under that AOR's shard lock, so a lookup,
/// an expiry deletion and a concurrent REGISTER never interleave.
#[derive(Debug, Default)]
pub struct RegistrarStore {
    bindings: DashMap<String, Binding>,
}

impl RegistrarStore {
    pub fn new() -> Self {
        Self {
            bindings: DashMap::new(),
        }
    }

    /// Apply a REGISTER.
    ///
    /// Zero expiry removes the binding if there is one (removing an absent
    /// binding is not an error). A positive expiry creates or overwrites it;
    /// the last write wins.
    pub fn upsert(
        &self,
        aor: &str,
        contact: &str,
        transport: Arc<dyn Transport>,
        client_addr: SocketAddr,
        expires_secs: u32,
    ) -> UpsertOutcome {
        self.upsert_at(aor, contact, transport, client_addr, expires_secs, Utc::now())
    }

    /// [`upsert`](Self::upsert) against an explicit clock
    pub fn upsert_at(
        &self,
        aor: &str,
        contact: &str,
        transport: Arc<dyn Transport>,
        client_addr: SocketAddr,
        expires_secs: u32,
        now: DateTime<Utc>,
    ) -> UpsertOutcome {
        if expires_secs == 0 {
            let removed = self.bindings.remove(aor).is_some();
            if removed {
                info!("User {} unregistered", aor);
            } else {
                debug!("Unregister for {} ignored, no binding", aor);
            }
            return UpsertOutcome::Unregistered { removed };
        }

        let expires_at = now + Duration::seconds(i64::from(expires_secs));
        self.insert(
            aor,
            Binding {
                contact: contact.to_string(),
                transport,
                client_addr,
                expires_at,
            },
        );
        info!("User {} registered with contact {} (expires in {}s)", aor, contact, expires_secs);

        UpsertOutcome::Registered { expires_at }
    }

    /// Store a binding as-is, replacing any previous one
    pub fn insert(&self, aor: &str, binding: Binding) -> Option<Binding> {
        self.bindings.insert(aor.to_string(), binding)
    }

    /// Current binding for `aor`, without checking expiry
    pub fn lookup(&self, aor: &str) -> Option<Binding> {
        self.bindings.get(aor).map(|entry| entry.value().clone())
    }

    /// Whether any binding (expired or not) exists for `aor`
    pub fn contains(&self, aor: &str) -> bool {
        self.bindings.contains_key(aor)
    }

    /// True if `aor` has an unexpired binding. An expired binding is deleted.
    pub fn check_validity(&self, aor: &str) -> bool {
        self.check_validity_at(aor, Utc::now())
    }

    /// [`check_validity`](Self::check_validity) against an explicit clock
    pub fn check_validity_at(&self, aor: &str, now: DateTime<Utc>) -> bool {
        self.valid_binding_at(aor, now).is_ok()
    }

    /// The binding for `aor` if it is still valid, checked and fetched under
    /// one lock. An expired binding is deleted and reported as
    /// [`RegistrarError::RegistrationExpired`].
    pub fn valid_binding(&self, aor: &str) -> Result<Binding> {
        self.valid_binding_at(aor, Utc::now())
    }

    pub fn valid_binding_at(&self, aor: &str, now: DateTime<Utc>) -> Result<Binding> {
        match self.bindings.entry(aor.to_string()) {
            Entry::Occupied(entry) => {
                if entry.get().is_valid_at(now) {
                    Ok(entry.get().clone())
                } else {
                    entry.remove();
                    warn!("registration for {} has expired", aor);
                    Err(RegistrarError::RegistrationExpired(aor.to_string()))
                }
            }
            Entry::Vacant(_) => Err(RegistrarError::UserNotFound(aor.to_string())),
        }
    }

    /// Transport and client address to reach `aor`
    pub fn transport(&self, aor: &str) -> Result<(Arc<dyn Transport>, SocketAddr)> {
        self.bindings
            .get(aor)
            .map(|entry| (entry.transport.clone(), entry.client_addr))
            .ok_or_else(|| RegistrarError::UserNotFound(aor.to_string()))
    }

    /// `(aor, contact)` pairs sorted by AOR, for diagnostics
    pub fn snapshot(&self) -> Vec<(String, String)> {
        let mut rows: Vec<(String, String)> = self
            .bindings
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().contact.clone()))
            .collect();
        rows.sort();
        rows
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
