//! Configuration for the jarvis server.

use jarvis_core::ImprovementType;
use jarvis_evolution::EngineConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "JARVIS";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Evolution engine configuration
    #[serde(default)]
    pub engine: EngineConfig,

    /// Improvement handler configuration
    #[serde(default)]
    pub handlers: HandlersConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            enable_cors: true,
        }
    }
}

/// History backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// JSON-lines file in the data directory
    #[default]
    Jsonl,
    /// In-memory only; history is lost on exit
    Memory,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the history file
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// History backend
    #[serde(default)]
    pub backend: StorageBackend,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            backend: StorageBackend::Jsonl,
        }
    }
}

/// Improvement handler configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HandlersConfig {
    /// Improvement types left without a handler
    #[serde(default)]
    pub disabled: Vec<ImprovementType>,
}

impl HandlersConfig {
    /// Whether a type has a handler.
    pub fn is_enabled(&self, kind: ImprovementType) -> bool {
        !self.disabled.contains(&kind)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level, overridden by `RUST_LOG`
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

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8000))
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration: defaults, then the file (if given), then
    /// `JARVIS_`-prefixed environment variables such as
    /// `JARVIS_SERVER__LISTEN_ADDR`.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        // Add default configuration
        builder = builder.add_source(config::Config::try_from(&AppConfig::default())?);

        // Add file configuration if provided
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        // Add environment variables with JARVIS_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("handlers.disabled")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.listen_addr.port(), 8000);
        assert!(config.server.enable_cors);
        assert_eq!(config.storage.backend, StorageBackend::Jsonl);
        assert_eq!(config.storage.data_dir, PathBuf::from("data"));
        assert_eq!(config.engine.interval_secs, 300);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = AppConfig::load(None).unwrap();
        assert_eq!(config.engine.medium_cap, 3);
        assert_eq!(config.engine.apply_timeout_ms, 30_000);
        assert!(config.handlers.disabled.is_empty());
    }

    #[test]
    fn test_load_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jarvis.toml");
        std::fs::write(
            &path,
            r#"
[server]
listen_addr = "0.0.0.0:9100"

[storage]
backend = "memory"

[engine]
interval_secs = 60
cooldown_cycles = 2

[engine.thresholds]
latency_regression = 0.5

[handlers]
disabled = ["bug_fix"]
"#,
        )
        .unwrap();

        let config = AppConfig::load(path.to_str()).unwrap();
        assert_eq!(config.server.listen_addr.port(), 9100);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.engine.interval_secs, 60);
        assert_eq!(config.engine.cooldown_cycles, 2);
        assert_eq!(config.engine.thresholds.latency_regression, 0.5);
        assert_eq!(config.engine.thresholds.latency_creep, 0.05);
        assert!(!config.handlers.is_enabled(ImprovementType::BugFix));
        assert!(config.handlers.is_enabled(ImprovementType::NewCapability));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(AppConfig::load(Some("/nonexistent/jarvis.toml")).is_err());
    }
}
