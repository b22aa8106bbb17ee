//! Configuration for connecting to a server

use std::path::Path;

use config::Config;
use serde::Deserialize;

use crate::{DEFAULT_BUFFER_SIZE, DEFAULT_PORT};

/// All configuration
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Client configuration.
    pub client: ClientConfig,
    /// Logging configuration.
    pub log: LogConfig,
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// The host address of the server.
    pub host: String,
    /// The port number of the server.
    pub port: u16,
    /// Capacity of the read and write buffers of a connection, in bytes.
    pub buffer_size: usize,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directives used when `RUST_LOG` is not set, e.g. `info` or `redline=debug`.
    pub level: String,
}

impl Configuration {
    /// Get the configuration from an optional file, overridden by environment variables
    /// such as `REDLINE__CLIENT__PORT=6380`.
    pub fn get(file: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(config::File::from(file));
        }
        let conf = builder
            .add_source(config::Environment::with_prefix("REDLINE").separator("__"))
            .build()?;
        conf.try_deserialize()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
