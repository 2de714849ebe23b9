mod file_config;

pub use file_config::FileConfig;

use crate::persistence::{MACHINES_FILE_NAME, TOOLS_FILE_NAME, TOOL_TYPES_FILE_NAME};
use crate::server::{RequestsLoggingLevel, ServerConfig};
use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub data_dir: Option<PathBuf>,
    pub port: u16,
    pub bind_address: String,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub autosave_interval_sec: u64,
    pub server_ip: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub port: u16,
    pub bind_address: IpAddr,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    /// Zero disables periodic saving.
    pub autosave_interval_sec: u64,
    pub server_ip: Option<IpAddr>,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .or_else(|| cli.data_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("data_dir must be specified via --data-dir or in config file")
            })?;

        if !data_dir.exists() {
            bail!("Data directory does not exist: {:?}", data_dir);
        }
        if !data_dir.is_dir() {
            bail!("data_dir is not a directory: {:?}", data_dir);
        }

        let port = file.port.unwrap_or(cli.port);

        let bind_address = file
            .bind_address
            .unwrap_or_else(|| cli.bind_address.clone());
        let bind_address: IpAddr = bind_address
            .parse()
            .with_context(|| format!("Invalid bind_address: {:?}", bind_address))?;

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());

        let autosave_interval_sec = file
            .autosave_interval_sec
            .unwrap_or(cli.autosave_interval_sec);

        let server_ip = match file.server_ip.or_else(|| cli.server_ip.clone()) {
            Some(raw) => Some(
                raw.parse::<IpAddr>()
                    .with_context(|| format!("Invalid server_ip: {:?}", raw))?,
            ),
            None => None,
        };

        Ok(AppConfig {
            data_dir,
            port,
            bind_address,
            logging_level,
            frontend_dir_path,
            autosave_interval_sec,
            server_ip,
        })
    }

    pub fn tools_path(&self) -> PathBuf {
        self.data_dir.join(TOOLS_FILE_NAME)
    }

    pub fn machines_path(&self) -> PathBuf {
        self.data_dir.join(MACHINES_FILE_NAME)
    }

    pub fn tool_types_path(&self) -> PathBuf {
        self.data_dir.join(TOOL_TYPES_FILE_NAME)
    }

    pub fn autosave_interval(&self) -> Option<Duration> {
        match self.autosave_interval_sec {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// URL to open on this machine. A wildcard bind is reached over loopback.
    pub fn local_url(&self) -> String {
        let ip = match self.bind_address {
            IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
            IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
            ip => ip,
        };
        format!("http://{}", SocketAddr::new(ip, self.port))
    }

    pub fn network_url(&self, server_ip: IpAddr) -> String {
        format!("http://{}", SocketAddr::new(server_ip, self.port))
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            requests_logging_level: self.logging_level.clone(),
            bind_address: self.bind_address,
            port: self.port,
            frontend_dir_path: self.frontend_dir_path.clone(),
        }
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
