//! Configuration system for the `MarketChat` client.
//!
//! Layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/marketchat/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::PathBuf;
use std::time::Duration;

use crate::chat::view::DEFAULT_MATCH_WINDOW_MS;
use crate::delivery::poll::DEFAULT_POLL_INTERVAL;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

/// How confirmed messages reach the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// Live fan-out subscription.
    Push,
    /// Cursor polling against the store.
    Poll,
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    delivery: DeliveryFileConfig,
    chat: ChatFileConfig,
    store: StoreFileConfig,
}

/// `[delivery]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct DeliveryFileConfig {
    transport: Option<TransportMode>,
    poll_interval_ms: Option<u64>,
}

/// `[chat]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ChatFileConfig {
    pending_match_window_ms: Option<u64>,
    event_buffer: Option<usize>,
}

/// `[store]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct StoreFileConfig {
    fanout_capacity: Option<usize>,
}

// ---------------------------------------------------------------------------
// Resolved configuration (concrete types, all fields populated)
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// How confirmed messages reach the client.
    pub transport: TransportMode,
    /// Interval between poll fetches (poll transport only).
    pub poll_interval: Duration,
    /// Correlation window for token-less echo matching.
    pub pending_match_window_ms: u64,
    /// Buffer size for the `ChatClient` event channel.
    pub event_buffer: usize,
    /// Per-conversation fan-out topic capacity.
    pub fanout_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            transport: TransportMode::Push,
            poll_interval: DEFAULT_POLL_INTERVAL,
            pending_match_window_ms: DEFAULT_MATCH_WINDOW_MS,
            event_buffer: 64,
            fanout_capacity: 256,
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args and a TOML file.
    ///
    /// If `--config` is given and the file does not exist, returns an
    /// error. If no `--config` is given, the default path
    /// (`~/.config/marketchat/config.toml`) is tried and silently
    /// ignored if missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be
    /// read or parsed.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Resolve a `ClientConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default. Separated from `load()` to enable
    /// unit testing without CLI parsing.
    #[must_use]
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            transport: cli
                .transport
                .or(file.delivery.transport)
                .unwrap_or(defaults.transport),
            poll_interval: cli
                .poll_interval_ms
                .or(file.delivery.poll_interval_ms)
                .map_or(defaults.poll_interval, Duration::from_millis),
            pending_match_window_ms: file
                .chat
                .pending_match_window_ms
                .unwrap_or(defaults.pending_match_window_ms),
            event_buffer: file.chat.event_buffer.unwrap_or(defaults.event_buffer),
            fanout_capacity: file
                .store
                .fanout_capacity
                .unwrap_or(defaults.fanout_capacity),
        }
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Marketplace chat client")]
pub struct CliArgs {
    /// Delivery transport (push or poll).
    #[arg(long, value_enum, env = "MARKETCHAT_TRANSPORT")]
    pub transport: Option<TransportMode>,

    /// Poll interval in milliseconds (poll transport only).
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// Path to config file (default: `~/.config/marketchat/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "MARKETCHAT_LOG")]
    pub log_level: String,
}

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and a missing
/// file is treated as empty config.
fn load_config_file(explicit_path: Option<&std::path::Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            // No config dir available — use defaults.
            return Ok(ConfigFile::default());
        };
        config_dir.join("marketchat").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
