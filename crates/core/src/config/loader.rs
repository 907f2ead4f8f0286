use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Read the engine config: the TOML file first, then `SHELFSYNC_` variables
/// on top of it.
///
/// Sections are split on `__`, so `SHELFSYNC_IMPORT__PAGE_SIZE=50` replaces
/// `import.page_size` and `SHELFSYNC_SCHEDULER__RUN_AS_USER=admin` sets the
/// scheduler's acting user. Sections missing from both fall back to their
/// defaults.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("SHELFSYNC_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Parse a TOML document on its own, without the file check or any
/// environment overlay.
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}
