pub mod check_url;
pub mod config_cmd;
pub mod estimate;
pub mod inspect;

use arenaguard_config::{AppConfig, ConfigError};
use std::path::Path;

/// Load from `path` when given, else from the default location. Environment
/// overrides apply either way.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    tracing::debug!(path = ?path, "Loading configuration");
    match path {
        Some(path) => {
            let mut config = AppConfig::load_from(path)?;
            config.apply_env_overrides(|key| std::env::var(key).ok())?;
            config.validate()?;
            Ok(config)
        }
        None => AppConfig::load(),
    }
}
