//! TOML configuration for the server binary.
//!
//! Every field has a default, so the server runs with no config file at all
//! and a partial file only overrides what it names.  Root-layer dimensions
//! are deliberately not configurable: viewers are synchronized against a
//! fixed 1024x768 display, and the replay stream depends on it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use easel_core::DEFAULT_PORT;

/// Default location of the config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "easel.toml";

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: GeneralConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// General behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralConfig {
    /// `tracing` log level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Name a viewer selects during the handshake.
    #[serde(default = "default_protocol_name")]
    pub protocol_name: String,
}

/// Listener settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// IP address to bind the listener to.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Per-connection timing settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    /// Seconds a viewer may take to complete each handshake step.
    #[serde(default = "default_timeout_secs")]
    pub handshake_timeout_secs: u64,
    /// Seconds of inbound silence after which the viewer is presumed gone.
    #[serde(default = "default_timeout_secs")]
    pub viewer_timeout_secs: u64,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_protocol_name() -> String {
    "ball".to_string()
}
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_timeout_secs() -> u64 {
    15
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            protocol_name: default_protocol_name(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            handshake_timeout_secs: default_timeout_secs(),
            viewer_timeout_secs: default_timeout_secs(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&text)?)
    }

    /// Listener address in `host:port` form.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.network.bind_address, self.network.port)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.session.handshake_timeout_secs)
    }

    pub fn viewer_timeout(&self) -> Duration {
        Duration::from_secs(self.session.viewer_timeout_secs)
    }
}
