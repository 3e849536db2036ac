//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use agora_crypto::MAX_PUBLIC_TOKEN_HOURS;
use agora_rpc::ApiSettings;

use crate::logging::LogFormat;
use crate::NodeError;

/// Configuration for an Agora voting node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Secrets have no usable default:
/// [`NodeConfig::validate`] rejects an empty `token_secret` or
/// `admin_api_key`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Interface the HTTP API binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// HTTP API port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// HMAC secret for voting tokens.
    #[serde(default)]
    pub token_secret: String,

    /// Bearer key for the admin endpoints.
    #[serde(default)]
    pub admin_api_key: String,

    /// Base URL of the resident-facing frontend, used in generated links.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    /// Lifetime of a public voting link when the admin does not choose one.
    #[serde(default = "default_public_token_hours")]
    pub default_public_token_hours: u32,

    /// Seconds between heartbeats on idle vote streams.
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,

    /// Events buffered per stream before a slow subscriber is dropped.
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,

    /// Unwatched votings are evicted from the live cache after this long.
    #[serde(default = "default_cache_idle_secs")]
    pub cache_idle_secs: u64,

    /// How often the idle sweep runs.
    #[serde(default = "default_cache_sweep_secs")]
    pub cache_sweep_secs: u64,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// JSON file the in-memory ledger is seeded from.
    #[serde(default)]
    pub seed_file: Option<PathBuf>,

    /// Whether to serve Prometheus metrics at `/metrics`.
    #[serde(default)]
    pub enable_metrics: bool,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    7080
}

fn default_public_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_public_token_hours() -> u32 {
    24
}

fn default_heartbeat_secs() -> u64 {
    30
}

fn default_subscriber_buffer() -> usize {
    agora_broadcast::DEFAULT_SUBSCRIBER_BUFFER
}

fn default_cache_idle_secs() -> u64 {
    15 * 60
}

fn default_cache_sweep_secs() -> u64 {
    60
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Reject configurations the node cannot run with.
    pub fn validate(&self) -> Result<(), NodeError> {
        if self.token_secret.trim().is_empty() {
            return Err(NodeError::Config("token_secret must be set".into()));
        }
        if self.admin_api_key.trim().is_empty() {
            return Err(NodeError::Config("admin_api_key must be set".into()));
        }
        if self.default_public_token_hours == 0
            || self.default_public_token_hours > MAX_PUBLIC_TOKEN_HOURS
        {
            return Err(NodeError::Config(format!(
                "default_public_token_hours must be between 1 and {MAX_PUBLIC_TOKEN_HOURS}"
            )));
        }
        if self.heartbeat_secs == 0 {
            return Err(NodeError::Config("heartbeat_secs must be positive".into()));
        }
        if self.subscriber_buffer == 0 {
            return Err(NodeError::Config("subscriber_buffer must be positive".into()));
        }
        if self.cache_sweep_secs == 0 {
            return Err(NodeError::Config("cache_sweep_secs must be positive".into()));
        }
        self.socket_addr()?;
        self.log_format()?;
        Ok(())
    }

    /// The address the HTTP API listens on.
    pub fn socket_addr(&self) -> Result<SocketAddr, NodeError> {
        format!("{}:{}", self.bind_address, self.port)
            .parse()
            .map_err(|e| {
                NodeError::Config(format!(
                    "invalid bind address {}:{}: {e}",
                    self.bind_address, self.port
                ))
            })
    }

    pub fn log_format(&self) -> Result<LogFormat, NodeError> {
        self.log_format.parse()
    }

    /// The slice of configuration the HTTP layer needs.
    pub fn api_settings(&self) -> ApiSettings {
        ApiSettings {
            admin_api_key: self.admin_api_key.clone(),
            public_base_url: self.public_base_url.trim_end_matches('/').to_string(),
            default_public_token_hours: self.default_public_token_hours,
            heartbeat: Duration::from_secs(self.heartbeat_secs),
            enable_metrics: self.enable_metrics,
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            token_secret: String::new(),
            admin_api_key: String::new(),
            public_base_url: default_public_base_url(),
            default_public_token_hours: default_public_token_hours(),
            heartbeat_secs: default_heartbeat_secs(),
            subscriber_buffer: default_subscriber_buffer(),
            cache_idle_secs: default_cache_idle_secs(),
            cache_sweep_secs: default_cache_sweep_secs(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            seed_file: None,
            enable_metrics: false,
        }
    }
}
