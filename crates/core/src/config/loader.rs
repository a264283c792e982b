use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;

use super::{types::BootstrapConfig, ConfigError};

/// Environment prefix for overrides, e.g. `BOOTSTRAP_RETRY__ATTEMPTS=8`
const ENV_PREFIX: &str = "BOOTSTRAP_";

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<BootstrapConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    extract(base().merge(Toml::file(path)))
}

/// Load configuration from an optional file, falling back to defaults
/// (plus environment overrides) when no file is present
pub fn load_config_or_default(path: Option<&Path>) -> Result<BootstrapConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => extract(base()),
    }
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<BootstrapConfig, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

fn base() -> Figment {
    Figment::from(Serialized::defaults(BootstrapConfig::default()))
}

fn extract(figment: Figment) -> Result<BootstrapConfig, ConfigError> {
    figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}
