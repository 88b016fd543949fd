//! # siprelay registrar core
//!
//! The registrar maps an address-of-record (`user@host`) to the single place
//! that identity currently answers: its contact, the transport it registered
//! through, the client address the REGISTER came from, and when the binding
//! lapses.
//!
//! Expiry is lazy. Nothing sweeps the table; a binding found past its expiry
//! during [`RegistrarStore::check_validity`] is removed on the spot.

pub mod error;
pub mod registrar;
pub mod types;

pub use error::{RegistrarError, Result};
pub use registrar::RegistrarStore;
pub use types::{Binding, UpsertOutcome};
