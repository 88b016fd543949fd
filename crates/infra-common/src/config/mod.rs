//! Configuration file loading
//!
//! Components describe their configuration as a serde type; this module only
//! knows how to turn a TOML file (or string) into such a type.

use crate::errors::types::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Source of configuration data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSource {
    /// Configuration from default values
    Default,
    /// Configuration from file
    File,
    /// Configuration from command line arguments
    CommandLine,
}

/// Load a configuration value from a TOML file
pub fn load_toml_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Cannot read {}: {}", path.display(), e)))?;
    parse_toml(&text).map_err(|e| match e {
        Error::ConfigParse { message, .. } => Error::ConfigParse {
            path: path.display().to_string(),
            message,
        },
        other => other,
    })
}

/// Parse a configuration value from TOML text
pub fn parse_toml<T: DeserializeOwned>(text: &str) -> Result<T> {
    toml::from_str(text).map_err(|e| Error::ConfigParse {
        path: "<inline>".to_string(),
        message: e.to_string(),
    })
}
