/// Configuration for the sync coordinator
///
/// Layered like a 12-factor app:
/// 1. Defaults (from code)
/// 2. Config file (sigec.toml)
/// 3. Environment variables (SIGEC_* prefix)
///
/// # Example
///
/// ```no_run
/// use sigec_store::config::ConfigLoader;
///
/// let config = ConfigLoader::load_default().expect("Failed to load config");
/// assert!(config.retry.max_retries < 100);
/// ```
pub mod error;
pub mod loader;

pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, ENV_PREFIX, HeaderPolicy, SyncConfig};
