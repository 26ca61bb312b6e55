//! Server configuration.
//!
//! Settings come from three places, later ones winning:
//!
//! 1. Built-in defaults (the `default_*` functions below).
//! 2. An optional TOML file passed with `--config`.
//! 3. Command-line flags / environment variables (applied in `main.rs`).
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0"
//! port = 5015
//! http_root = "../static/"
//!
//! [schedule]
//! fps = 60.0
//!
//! [control]
//! lease_secs = 10
//! rotation = "claimants"      # or "all_viewers"
//!
//! [device]
//! host = "192.168.1.73"
//! community = "private"
//! port = 1
//! poll_interval_ms = 1000
//!
//! [logging]
//! level = "info"
//! ```
//!
//! Every field has a serde default, so a file only needs the keys it
//! changes and an empty file is valid.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uicast_core::application::MAX_LEASE;
use uicast_core::{Pacer, RotationPolicy};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid listen address '{0}'")]
    InvalidAddress(String),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: NetworkSection,
    #[serde(default)]
    pub schedule: ScheduleSection,
    #[serde(default)]
    pub control: ControlSection,
    #[serde(default)]
    pub device: DeviceSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Listener and static-asset settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkSection {
    /// IP address to bind to.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// WebSocket listen port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory holding the browser viewer page.  Served by an external
    /// static file server; only logged here.
    #[serde(default = "default_http_root")]
    pub http_root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleSection {
    /// Ticks (and frames) per second.
    #[serde(default = "default_fps")]
    pub fps: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControlSection {
    /// Control lease length in seconds.
    #[serde(default = "default_lease_secs")]
    pub lease_secs: u64,
    #[serde(default)]
    pub rotation: RotationPolicy,
}

/// The SNMP-managed I/O device whose pins the panel shows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceSection {
    /// Initial device address; editable from the panel at runtime.
    #[serde(default = "default_device_host")]
    pub host: String,
    #[serde(default = "default_community")]
    pub community: String,
    /// Device port number substituted into `oid_template`.
    #[serde(default = "default_device_port")]
    pub port: u8,
    /// OID of the port register; `{port}` is replaced by the port number.
    #[serde(default = "default_oid_template")]
    pub oid_template: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Per-request SNMP timeout (`-t`), seconds.
    #[serde(default = "default_snmp_timeout_secs")]
    pub timeout_secs: u32,
    /// SNMP retries (`-r`).
    #[serde(default = "default_snmp_retries")]
    pub retries: u32,
    #[serde(default = "default_snmpget")]
    pub snmpget: String,
    #[serde(default = "default_snmpset")]
    pub snmpset: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSection {
    /// Fallback `tracing` filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    5015
}
fn default_http_root() -> PathBuf {
    PathBuf::from("../static/")
}
fn default_fps() -> f64 {
    60.0
}
fn default_lease_secs() -> u64 {
    10
}
fn default_device_host() -> String {
    "192.168.1.73".to_string()
}
fn default_community() -> String {
    "private".to_string()
}
fn default_device_port() -> u8 {
    1
}
fn default_oid_template() -> String {
    "enterprises.19865.1.2.{port}.33.0".to_string()
}
fn default_poll_interval_ms() -> u64 {
    1000
}
fn default_snmp_timeout_secs() -> u32 {
    1
}
fn default_snmp_retries() -> u32 {
    1
}
fn default_snmpget() -> String {
    "snmpget".to_string()
}
fn default_snmpset() -> String {
    "snmpset".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for NetworkSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            http_root: default_http_root(),
        }
    }
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self { fps: default_fps() }
    }
}

impl Default for ControlSection {
    fn default() -> Self {
        Self {
            lease_secs: default_lease_secs(),
            rotation: RotationPolicy::default(),
        }
    }
}

impl Default for DeviceSection {
    fn default() -> Self {
        Self {
            host: default_device_host(),
            community: default_community(),
            port: default_device_port(),
            oid_template: default_oid_template(),
            poll_interval_ms: default_poll_interval_ms(),
            timeout_secs: default_snmp_timeout_secs(),
            retries: default_snmp_retries(),
            snmpget: default_snmpget(),
            snmpset: default_snmpset(),
        }
    }
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ServerConfig {
    /// The socket address to listen on.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidAddress`] if `bind` is not an IP
    /// address.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let text = format!("{}:{}", self.server.bind, self.server.port);
        text.parse().map_err(|_| ConfigError::InvalidAddress(text))
    }

    pub fn lease(&self) -> Duration {
        Duration::from_secs(self.control.lease_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.device.poll_interval_ms)
    }

    /// Rejects values the runtime cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Err(e) = Pacer::new(self.schedule.fps) {
            return Err(ConfigError::InvalidValue {
                field: "schedule.fps",
                reason: e.to_string(),
            });
        }
        if self.control.lease_secs == 0 || self.control.lease_secs > MAX_LEASE.as_secs() {
            return Err(ConfigError::InvalidValue {
                field: "control.lease_secs",
                reason: format!(
                    "must be between 1 and {}, got {}",
                    MAX_LEASE.as_secs(),
                    self.control.lease_secs
                ),
            });
        }
        if self.device.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "device.poll_interval_ms",
                reason: "must be at least 1".to_string(),
            });
        }
        if !self.device.oid_template.contains("{port}") {
            return Err(ConfigError::InvalidValue {
                field: "device.oid_template",
                reason: "must contain the {port} placeholder".to_string(),
            });
        }
        self.listen_addr().map(|_| ())
    }
}

/// Parses configuration from TOML text.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] if the TOML is malformed or a value has
/// the wrong type.
pub fn parse_config(text: &str) -> Result<ServerConfig, ConfigError> {
    Ok(toml::from_str(text)?)
}

/// Loads configuration from `path`.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read (a path given
/// explicitly must exist) and [`ConfigError::Parse`] if it is malformed.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
