//! Configuration for tally-daemon

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Counter store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Request authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,

    /// Upstream language model configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    pub listen_addr: SocketAddr,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 4943)),
            enable_cors: true,
            request_timeout_secs: default_request_timeout(),
            max_body_size: default_max_body_size(),
        }
    }
}

/// What to do when the snapshot file cannot be decoded at boot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorruptStatePolicy {
    /// Keep serving public capabilities; refuse counter calls
    #[default]
    Quarantine,

    /// Refuse to start
    Abort,
}

/// Counter store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Load at boot and snapshot at shutdown; off keeps state in memory only
    #[serde(default = "default_true")]
    pub persistence: bool,

    /// Snapshot file location
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,

    /// Behaviour on an undecodable snapshot
    #[serde(default)]
    pub on_corrupt: CorruptStatePolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            persistence: true,
            snapshot_path: default_snapshot_path(),
            on_corrupt: CorruptStatePolicy::default(),
        }
    }
}

/// Signed-request verification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Accepted distance between the request timestamp and server time
    #[serde(default = "default_clock_skew")]
    pub clock_skew_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            clock_skew_secs: default_clock_skew(),
        }
    }
}

/// Upstream model flavour
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmKind {
    /// Ollama-compatible `/api/generate` and `/api/chat`
    #[default]
    Ollama,

    /// OpenAI-compatible chat completions
    OpenAi,
}

/// Upstream language model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub kind: LlmKind,

    /// Base URL (Ollama) or full completions URL (OpenAI); empty means the
    /// flavour's default
    #[serde(default)]
    pub endpoint: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Bearer token for OpenAI-compatible endpoints
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            kind: LlmKind::default(),
            endpoint: String::new(),
            model: default_llm_model(),
            api_key: String::new(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_body_size() -> usize {
    1024 * 1024
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("tally-state.json")
}

fn default_clock_skew() -> u64 {
    300
}

fn default_llm_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_llm_timeout() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DaemonConfig {
    /// Load configuration: defaults, then the optional file, then `TALLY_`
    /// environment variables (`TALLY_SERVER__LISTEN_ADDR=...`).
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&DaemonConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("TALLY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// In-memory configuration for tests and local experiments
    pub fn ephemeral() -> Self {
        Self {
            store: StoreConfig {
                persistence: false,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}
