//! Server configuration.

use crate::error::{ServerError, ServerResult};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for the resource server.
///
/// Can be built in code or loaded from a TOML file; every field is optional
/// in the file and falls back to its default.
///
/// ```toml
/// bind_addr = "127.0.0.1:8002"
/// data_dir = "/var/lib/c9"
/// request_timeout_secs = 5
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Repository directory.
    pub data_dir: PathBuf,
    /// How long a request body may take to arrive, in seconds.
    pub request_timeout_secs: u64,
    /// Largest accepted request body, in bytes.
    pub max_body_size: usize,
    /// Whether commits are flushed to disk before responding.
    pub sync_on_commit: bool,
}

impl ServerConfig {
    /// Creates a configuration serving `data_dir` on `bind_addr`.
    pub fn new(bind_addr: SocketAddr, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            bind_addr,
            data_dir: data_dir.into(),
            request_timeout_secs: 10,
            max_body_size: 16 * 1024 * 1024,
            sync_on_commit: true,
        }
    }

    /// Loads a configuration file.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Parses a TOML configuration.
    pub fn from_toml(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Sets the bind address.
    #[must_use]
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Sets the repository directory.
    #[must_use]
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Sets the request body timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_secs = timeout.as_secs();
        self
    }

    /// Sets the maximum request body size.
    #[must_use]
    pub fn with_max_body_size(mut self, bytes: usize) -> Self {
        self.max_body_size = bytes;
        self
    }

    /// Sets whether commits are flushed before responding.
    #[must_use]
    pub fn with_sync_on_commit(mut self, value: bool) -> Self {
        self.sync_on_commit = value;
        self
    }

    /// Returns the request body timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([0, 0, 0, 0], 8002)), "/srv/c9")
    }
}
