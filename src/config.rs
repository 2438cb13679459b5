//! Configuration for an Assuan server
//!
//! Centralized configuration with sensible defaults. Can be built in code
//! with [`Config::builder`] or read from a TOML file:
//!
//! ```toml
//! listen_addr = "127.0.0.1:7300"
//! socket_path = "/run/user/1000/demo.sock"
//! max_connections = 64
//! read_timeout_ms = 0
//! write_timeout_ms = 5000
//! greeting = "demo server ready"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{AssuanError, Result};

/// Main configuration for a server instance
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Transport Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address, used when no socket path is set
    pub listen_addr: String,

    /// Unix domain socket path; takes precedence over `listen_addr`
    pub socket_path: Option<PathBuf>,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Protocol Configuration
    // -------------------------------------------------------------------------
    /// Greeting for servers that take it from configuration
    pub greeting: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:7300".to_string(),
            socket_path: None,
            max_connections: 1024,
            // Sessions may idle between commands
            read_timeout_ms: 0,
            write_timeout_ms: 5000,
            greeting: None,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| AssuanError::Config(e.to_string()))
    }

    /// Load a TOML configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            AssuanError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Listen on a Unix domain socket instead of TCP
    pub fn socket_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.socket_path = Some(path.into());
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the greeting
    pub fn greeting(mut self, greeting: impl Into<String>) -> Self {
        self.config.greeting = Some(greeting.into());
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
