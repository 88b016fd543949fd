//! Error types for registrar-core

use thiserror::Error;

/// Result type alias for registrar operations
pub type Result<T> = std::result::Result<T, RegistrarError>;

/// Main error type for registrar operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrarError {
    /// No binding for this address-of-record
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// The binding existed but had expired; it has been removed
    #[error("Registration expired for user: {0}")]
    RegistrationExpired(String),
}
