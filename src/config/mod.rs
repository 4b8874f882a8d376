//! Configuration management.
//!
//! Supports configuration from:
//! - TOML config files
//! - Environment variables (prefix `FLARELINK_`)

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::{DEFAULT_MAX_REDIRECTS, DEFAULT_RECONNECT_DELAY_MS};
use crate::error::{FlarelinkError, Result};
use crate::events::{DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS};

/// Main client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Server host to negotiate with
    pub host: String,

    /// Server port to negotiate with
    pub port: u16,

    /// Handshake transport settings
    #[serde(default)]
    pub handshake: HandshakeConfig,

    /// Auto-reconnect settings
    #[serde(default)]
    pub reconnect: ReconnectConfig,

    /// Event delivery settings
    #[serde(default)]
    pub events: EventConfig,

    /// Redirect handling settings
    #[serde(default)]
    pub redirect: RedirectConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            handshake: HandshakeConfig::default(),
            reconnect: ReconnectConfig::default(),
            events: EventConfig::default(),
            redirect: RedirectConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| FlarelinkError::Config(format!("failed to read config file: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| FlarelinkError::Config(format!("failed to parse config: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("FLARELINK_HOST") {
            config.host = host;
        }
        if let Ok(port) = std::env::var("FLARELINK_PORT") {
            if let Ok(port) = port.parse() {
                config.port = port;
            }
        }
        if let Ok(delay) = std::env::var("FLARELINK_RECONNECT_MS") {
            if let Ok(delay) = delay.parse() {
                config.reconnect.enabled = true;
                config.reconnect.delay_ms = delay;
            }
        }
        if let Ok(workers) = std::env::var("FLARELINK_EVENT_WORKERS") {
            if let Ok(workers) = workers.parse() {
                config.events.workers = workers;
            }
        }

        config
    }
}

/// Handshake transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeConfig {
    /// Time budget for one handshake request, in seconds
    pub timeout_secs: u64,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: crate::transport::DEFAULT_HANDSHAKE_TIMEOUT_SECS,
        }
    }
}

impl HandshakeConfig {
    /// Request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Auto-reconnect configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Whether the client reconnects on failure
    pub enabled: bool,

    /// Fixed delay between attempts, in milliseconds
    pub delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            delay_ms: DEFAULT_RECONNECT_DELAY_MS,
        }
    }
}

/// Event delivery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventConfig {
    /// Signal-delivery worker count (1 = sequential delivery)
    pub workers: usize,

    /// Bound of the pending-signal queue
    pub queue_capacity: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Redirect handling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedirectConfig {
    /// Maximum redirect hops per negotiation
    pub max_hops: usize,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            max_hops: DEFAULT_MAX_REDIRECTS,
        }
    }
}
