//! Proxy configuration
//!
//! Every field has a default, so an empty TOML file (or no file at all) gives
//! a proxy listening on `0.0.0.0:5060`.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use siprelay_infra_common::config::{load_toml_file, parse_toml};
use siprelay_infra_common::errors::ErrorContext;
use siprelay_infra_common::logging::{parse_log_level, LoggingConfig};

use crate::dispatcher::{DispatchOptions, DEFAULT_BRANCH_SUFFIX};
use crate::error::Result;
use crate::identity::ProxyIdentity;
use crate::policy::AddressPolicy;
use crate::response::{TagPolicy, DEFAULT_FIXED_TAG};

/// Default SIP port
pub const DEFAULT_SIP_PORT: u16 = 5060;

/// How the To tag of local responses is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagMode {
    #[default]
    Fixed,
    Random,
}

/// Main configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Local UDP address to listen on
    pub bind_addr: SocketAddr,
    /// IP written into Via and Record-Route; falls back to the bind IP
    pub advertised_ip: Option<IpAddr>,
    /// Port written into Via and Record-Route; falls back to the bind port
    pub advertised_port: Option<u16>,
    pub branch_suffix: String,
    pub response_tag: TagMode,
    pub fixed_tag: String,
    pub rewrite_request_uri: bool,
    /// Source IP prefixes refused on REGISTER
    pub denied_source_prefixes: Vec<String>,
    /// Depth of the transport event queue
    pub channel_capacity: usize,
    pub logging: LogSection,
}

/// `[logging]` table
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogSection {
    pub level: String,
    pub json: bool,
    /// Log file; stdout when unset
    pub file: Option<PathBuf>,
    /// Put the start time into the log file name
    pub timestamped_file: bool,
    /// Source file and line on every event
    pub file_info: bool,
    /// Log span enter and exit
    pub log_spans: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_SIP_PORT),
            advertised_ip: None,
            advertised_port: None,
            branch_suffix: DEFAULT_BRANCH_SUFFIX.to_string(),
            response_tag: TagMode::Fixed,
            fixed_tag: DEFAULT_FIXED_TAG.to_string(),
            rewrite_request_uri: false,
            denied_source_prefixes: Vec::new(),
            channel_capacity: 100,
            logging: LogSection::default(),
        }
    }
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
            timestamped_file: false,
            file_info: false,
            log_spans: false,
        }
    }
}

impl ProxyConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(load_toml_file(path)?)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(parse_toml(text)?)
    }

    /// Address the proxy advertises in the headers it writes.
    ///
    /// An unspecified bind address (`0.0.0.0`) cannot be advertised, so
    /// `advertised_ip` is required in that case.
    pub fn identity(&self) -> Result<ProxyIdentity> {
        let ip = self.advertised_ip.unwrap_or_else(|| self.bind_addr.ip());
        if ip.is_unspecified() {
            return Err(ErrorContext::new("proxy-core", "identity")
                .with_details(format!(
                    "bind address {} is unspecified, set advertised_ip",
                    self.bind_addr
                ))
                .into_config_error()
                .into());
        }
        let port = self.advertised_port.unwrap_or_else(|| self.bind_addr.port());
        Ok(ProxyIdentity::new(ip, port))
    }

    pub fn dispatch_options(&self) -> DispatchOptions {
        let tags = match self.response_tag {
            TagMode::Fixed => TagPolicy::Fixed(self.fixed_tag.clone()),
            TagMode::Random => TagPolicy::Random,
        };
        DispatchOptions {
            branch_suffix: self.branch_suffix.clone(),
            tags,
            rewrite_request_uri: self.rewrite_request_uri,
            address_policy: AddressPolicy::new(self.denied_source_prefixes.iter().cloned()),
        }
    }
}

impl LogSection {
    pub fn to_logging_config(&self, app_name: &str) -> Result<LoggingConfig> {
        let mut config = LoggingConfig::new(parse_log_level(&self.level)?, app_name);
        if self.json {
            config = config.with_json();
        }
        if let Some(file) = &self.file {
            config = config.with_file(file.clone());
        }
        if self.timestamped_file {
            config = config.with_timestamped_file();
        }
        if self.file_info {
            config = config.with_file_info();
        }
        if self.log_spans {
            config = config.with_spans();
        }
        Ok(config)
    }
}
