use crate::config::error::{ConfigError, Result};
use crate::retry::RetryConfig;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix for environment overrides (`SIGEC_RETRY__MAX_RETRIES=5`).
pub const ENV_PREFIX: &str = "SIGEC";

/// What to do when the sheet header is an older version of the schema.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderPolicy {
    /// Any difference is a schema mismatch.
    #[default]
    Strict,
    /// A header that is a strict prefix of the current one is rewritten.
    ExtendPrefix,
}

/// Coordinator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Backoff applied to every store call
    #[serde(default)]
    pub retry: RetryConfig,

    /// Bound on a single store call; an expired call counts as a retryable
    /// failure.
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,

    #[serde(default)]
    pub header_policy: HeaderPolicy,
}

fn default_call_timeout_ms() -> u64 {
    15_000
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            call_timeout_ms: default_call_timeout_ms(),
            header_policy: HeaderPolicy::default(),
        }
    }
}

impl SyncConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.call_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "call_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.retry.backoff_multiplier.is_nan() || self.retry.backoff_multiplier < 1.0 {
            return Err(ConfigError::ValidationError(format!(
                "retry.backoff_multiplier must be at least 1.0, got {}",
                self.retry.backoff_multiplier
            )));
        }
        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return Err(ConfigError::ValidationError(format!(
                "retry.initial_backoff_ms ({}) exceeds retry.max_backoff_ms ({})",
                self.retry.initial_backoff_ms, self.retry.max_backoff_ms
            )));
        }
        Ok(())
    }
}

/// Configuration loader with layered merging support
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new ConfigLoader
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Set the configuration file path
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Load configuration with layered merging:
    /// 1. Start with defaults (from Default implementations)
    /// 2. Merge config file if provided
    /// 3. Override with environment variables (SIGEC_ prefix)
    pub fn load(&self) -> Result<SyncConfig> {
        let mut builder = Config::builder();

        let defaults_json = serde_json::to_string(&SyncConfig::default())?;
        builder = builder.add_source(File::from_str(&defaults_json, config::FileFormat::Json));

        if let Some(ref path) = self.config_path {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_ref()));
            } else {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
        }

        // Double underscore nests: SIGEC_RETRY__JITTER=false
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let sync_config: SyncConfig = builder.build()?.try_deserialize()?;
        sync_config.validate()?;

        tracing::debug!(
            path = ?self.config_path,
            max_retries = sync_config.retry.max_retries,
            call_timeout_ms = sync_config.call_timeout_ms,
            header_policy = ?sync_config.header_policy,
            "Sync configuration loaded"
        );
        Ok(sync_config)
    }

    /// Locate the default config file in standard locations:
    /// 1. Current directory: ./sigec.toml
    /// 2. XDG config: ~/.config/sigec/config.toml
    /// 3. Home directory: ~/.sigec.toml
    pub fn find_config_file() -> Option<PathBuf> {
        let cwd_config = PathBuf::from("./sigec.toml");
        if cwd_config.exists() {
            return Some(cwd_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("sigec").join("config.toml");
            if xdg_config.exists() {
                return Some(xdg_config);
            }
        }

        if let Some(home_dir) = dirs::home_dir() {
            let home_config = home_dir.join(".sigec.toml");
            if home_config.exists() {
                return Some(home_config);
            }
        }

        None
    }

    /// Load configuration from default locations
    pub fn load_default() -> Result<SyncConfig> {
        let loader = if let Some(config_path) = Self::find_config_file() {
            ConfigLoader::new().with_file(config_path)
        } else {
            ConfigLoader::new()
        };

        loader.load()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
