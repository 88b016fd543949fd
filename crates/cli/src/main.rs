//! `siprelay`: run the SIP proxy and registrar on a UDP socket.
//!
//! Settings come from an optional TOML file; command-line flags override it.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use siprelay_infra_common::config::ConfigSource;
use siprelay_infra_common::logging::{log_welcome, setup_logging};
use siprelay_proxy_core::ProxyConfig;
use siprelay_proxy_core::ProxyServer;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "siprelay")]
#[command(version, about = "Minimal SIP proxy and registrar over UDP")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Local address to listen on
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// IP written into Via and Record-Route headers
    #[arg(long)]
    advertise_ip: Option<IpAddr>,

    /// Port written into Via and Record-Route headers
    #[arg(long)]
    advertise_port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Write logs to this file instead of stdout
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Start a new log file named after the start time
    #[arg(long)]
    new_log_file: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

impl Args {
    /// Layer the flags that were given over `config`
    fn apply(&self, config: &mut ProxyConfig) -> ConfigSource {
        let mut source = ConfigSource::Default;
        if let Some(bind) = self.bind {
            config.bind_addr = bind;
            source = ConfigSource::CommandLine;
        }
        if let Some(ip) = self.advertise_ip {
            config.advertised_ip = Some(ip);
            source = ConfigSource::CommandLine;
        }
        if let Some(port) = self.advertise_port {
            config.advertised_port = Some(port);
            source = ConfigSource::CommandLine;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(file) = &self.log_file {
            config.logging.file = Some(file.clone());
        }
        if self.new_log_file {
            config.logging.timestamped_file = true;
        }
        if self.json_logs {
            config.logging.json = true;
        }
        source
    }
}

fn load_config(args: &Args) -> Result<(ProxyConfig, ConfigSource)> {
    let (mut config, file_source) = match &args.config {
        Some(path) => (
            ProxyConfig::from_file(path)
                .with_context(|| format!("loading configuration from {}", path.display()))?,
            ConfigSource::File,
        ),
        None => (ProxyConfig::default(), ConfigSource::Default),
    };

    let source = match args.apply(&mut config) {
        ConfigSource::CommandLine => ConfigSource::CommandLine,
        _ => file_source,
    };
    Ok((config, source))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let (config, source) = load_config(&args)?;

    let logging = config.logging.to_logging_config("siprelay")?;
    // Dropping the guard stops the log file writer
    let _guard = setup_logging(logging)?;
    log_welcome("siprelay", env!("CARGO_PKG_VERSION"));
    info!("Configuration source: {:?}", source);

    let (server, events) = ProxyServer::bind(&config)
        .await
        .context("starting proxy")?;
    info!("Listening on {}", server.local_addr()?);

    tokio::select! {
        _ = server.run(events) => {
            info!("Proxy stopped");
        }
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutting down");
            server.shutdown().await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_flags_override_defaults() {
        let args = Args::parse_from([
            "siprelay",
            "--bind",
            "127.0.0.1:5070",
            "--advertise-ip",
            "203.0.113.7",
            "--log-level",
            "debug",
            "--new-log-file",
        ]);
        let (config, source) = load_config(&args).unwrap();

        assert_eq!(source, ConfigSource::CommandLine);
        assert_eq!(config.bind_addr, "127.0.0.1:5070".parse::<SocketAddr>().unwrap());
        assert_eq!(
            config.identity().unwrap().addr(),
            "203.0.113.7:5070".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.timestamped_file);
        assert!(!config.logging.json);
    }

    #[test]
    fn test_no_flags_keeps_defaults() {
        let args = Args::parse_from(["siprelay"]);
        let (config, source) = load_config(&args).unwrap();
        assert_eq!(source, ConfigSource::Default);
        assert_eq!(config.bind_addr.port(), 5060);
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let args = Args::parse_from(["siprelay", "--config", "/nonexistent/siprelay.toml"]);
        assert!(load_config(&args).is_err());
    }
}
