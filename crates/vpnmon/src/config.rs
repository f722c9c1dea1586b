//! Monitor Configuration
//!
//! Loads `vpn-monitor.json` (or a TOML equivalent) describing the tunnels
//! to manage and how to reach their servers.
//!
//! # Example
//!
//! ```json
//! {
//!   "tunnels": [
//!     {
//!       "name": "vpn-ws0",
//!       "type": "vpn-ws",
//!       "client_private_ip": "10.8.0.2/16",
//!       "server_url": "wss://vpn.example.net/vpn"
//!     }
//!   ]
//! }
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use vpnmon_supervisor::{ClientCommand, SupervisorConfig, VPN_WS_CLIENT};
use vpnmon_tunnel::{TunnelSpec, ValidationError};

/// Default configuration file name
pub const CONFIG_NAME: &str = "vpn-monitor.json";

/// Top-level configuration file
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Tunnels to manage; only the first is brought up
    pub tunnels: Vec<TunnelConfig>,
    /// Append logs to this file instead of stderr
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    /// Pause between client exits and relaunches
    #[serde(default = "default_restart_delay_ms")]
    pub restart_delay_ms: u64,
}

fn default_restart_delay_ms() -> u64 {
    1000
}

/// Client implementation driving a tunnel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClientType {
    /// vpn-ws websocket client
    VpnWs,
}

/// One tunnel record
#[derive(Debug, Clone, Deserialize)]
pub struct TunnelConfig {
    /// Interface name, also passed to the client
    pub name: String,
    #[serde(rename = "type")]
    pub client_type: ClientType,
    /// IPv4 address with prefix (bare address means /32)
    pub client_private_ip: String,
    #[serde(default)]
    pub client_private_ipv6: Option<String>,
    pub server_url: String,
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default = "default_mtu")]
    pub mtu: u32,
    /// Client executable; defaults to `vpn-ws-client` next to our binary
    #[serde(default)]
    pub client_path: Option<PathBuf>,
}

fn default_mode() -> String {
    "tap".to_string()
}

fn default_mtu() -> u32 {
    1500
}

impl TunnelConfig {
    /// Validate this record into a tunnel spec
    pub fn to_spec(&self) -> Result<TunnelSpec, ValidationError> {
        let mut builder = TunnelSpec::builder(&self.name);
        builder
            .mode(&self.mode)?
            .mtu(self.mtu)?
            .ipv4_str(&self.client_private_ip)?;
        if let Some(ipv6) = &self.client_private_ipv6 {
            builder.ipv6_str(ipv6)?;
        }
        builder.build()
    }

    /// Command line for this tunnel's client
    pub fn client_command(&self, exe_dir: &Path) -> ClientCommand {
        match self.client_type {
            ClientType::VpnWs => {
                let program = self
                    .client_path
                    .clone()
                    .unwrap_or_else(|| exe_dir.join(VPN_WS_CLIENT));
                ClientCommand::vpn_ws(&program, &self.name, &self.server_url)
            }
        }
    }
}

impl MonitorConfig {
    /// Load from a file; `.toml` files are parsed as TOML, anything else
    /// as JSON
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml(&content),
            _ => Self::from_json(&content),
        }
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.tunnels.is_empty() {
            return Err(ConfigError::NoTunnels);
        }
        Ok(())
    }

    /// The tunnel this process manages
    pub fn first_tunnel(&self) -> Result<&TunnelConfig, ConfigError> {
        self.tunnels.first().ok_or(ConfigError::NoTunnels)
    }

    pub fn supervisor_config(&self) -> SupervisorConfig {
        SupervisorConfig {
            restart_delay: Duration::from_millis(self.restart_delay_ms),
        }
    }
}

/// Directory holding the config for a binary installed in `exe_dir`
pub fn config_dir_for(exe_dir: &Path) -> PathBuf {
    if exe_dir == Path::new("/usr/local/bin") {
        PathBuf::from("/usr/local/etc")
    } else if exe_dir == Path::new("/usr/bin") {
        PathBuf::from("/etc")
    } else {
        exe_dir.to_path_buf()
    }
}

/// Directory of the running executable, symlinks resolved
pub fn exe_dir() -> Result<PathBuf, ConfigError> {
    let exe = std::env::current_exe()
        .and_then(|p| p.canonicalize())
        .map_err(|e| ConfigError::Io {
            path: PathBuf::from("<current executable>"),
            source: e,
        })?;
    exe.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| ConfigError::Invalid(format!("{} has no parent directory", exe.display())))
}

/// Config path used when none is given on the command line
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir_for(&exe_dir()?).join(CONFIG_NAME))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("no tunnels configured")]
    NoTunnels,

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
