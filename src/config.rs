//! Server configuration
//!
//! Loaded from an optional JSON file. A `PORT` environment variable
//! takes precedence over the file's bind address.

use std::env;
use std::io::ErrorKind;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::AppError;
use crate::hub::DEFAULT_NOTIFY_WORKERS;

/// Default server address
pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";

/// Default per-client outbound buffer
pub const DEFAULT_CLIENT_BUFFER: usize = 32;

/// Runtime settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Address the TCP listener binds to
    pub bind_addr: String,
    /// Capacity of each client's outbound message channel
    pub client_buffer: usize,
    /// Max background notification tasks in flight
    pub notify_workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_ADDR.to_string(),
            client_buffer: DEFAULT_CLIENT_BUFFER,
            notify_workers: DEFAULT_NOTIFY_WORKERS,
        }
    }
}

impl Config {
    /// Load from `path`, falling back to defaults if the file is missing
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let config = match std::fs::read_to_string(path) {
            Ok(json) => Self::from_json(&json)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No config file at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => return Err(e.into()),
        };

        config.with_port(env::var("PORT").ok()).validated()
    }

    /// Parse a JSON document; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, AppError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Bind to all interfaces on `port` when one is given
    pub fn with_port(mut self, port: Option<String>) -> Self {
        if let Some(port) = port.filter(|p| !p.is_empty()) {
            self.bind_addr = format!("0.0.0.0:{}", port);
        }
        self
    }

    /// Reject values the server cannot run with
    pub fn validated(self) -> Result<Self, AppError> {
        if self.client_buffer == 0 {
            return Err(AppError::Config("clientBuffer must be at least 1".to_string()));
        }
        if self.notify_workers == 0 {
            return Err(AppError::Config("notifyWorkers must be at least 1".to_string()));
        }
        Ok(self)
    }
}
