//! Common infrastructure for the siprelay stack
//!
//! Shared pieces that every siprelay binary needs but that carry no protocol
//! logic of their own:
//!
//! - `errors`: the common error type
//! - `logging`: `tracing` subscriber installation (console, JSON, log files)
//! - `config`: TOML configuration file loading

pub mod config;
pub mod errors;
pub mod logging;

pub use errors::types::{Error, Result};
pub use logging::setup::{setup_logging, LoggingConfig};
