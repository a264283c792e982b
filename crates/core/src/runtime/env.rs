use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::ContextError;

/// Snapshot of configuration values gathered from `.env` and the process env.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentData {
    /// The `.env` file that was read, if one existed.
    pub env_file: Option<PathBuf>,
    /// Values read from the `.env` file only.
    pub file_values: HashMap<String, String>,
    /// `.env` values overlaid by the process environment.
    pub merged: HashMap<String, String>,
}

impl EnvironmentData {
    /// Environment backed by an in-memory map (no `.env` file).
    pub fn from_map<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            env_file: None,
            file_values: HashMap::new(),
            merged: values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Non-empty value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.merged
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Port from `key`, falling back to `default` when unset or invalid.
    pub fn port(&self, key: &str, default: u16) -> u16 {
        match self.get(key) {
            None => default,
            Some(raw) => match raw.parse::<u16>() {
                Ok(port) if port > 0 => port,
                _ => {
                    warn!("Invalid integer for {}: {}. Using default {}", key, raw, default);
                    default
                }
            },
        }
    }

    /// Boolean flag from `key`; unset means `default`.
    pub fn flag(&self, key: &str, default: bool) -> bool {
        self.get(key).map(parse_flag).unwrap_or(default)
    }

    /// Whether the stack routes torrent traffic through the VPN container.
    pub fn use_vpn(&self) -> bool {
        self.flag("USE_VPN", true)
    }
}

/// Anything other than false/0/no/off counts as enabled.
pub fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "false" | "0" | "no" | "off"
    )
}

/// Load `<root>/.env` (if present) and overlay `process_env` on top of it.
pub fn load_environment_data<I>(root_dir: &Path, process_env: I) -> Result<EnvironmentData, ContextError>
where
    I: IntoIterator<Item = (String, String)>,
{
    let env_path = root_dir.join(".env");
    let mut file_values = HashMap::new();

    if env_path.exists() {
        let iter = dotenvy::from_path_iter(&env_path).map_err(|e| ContextError::EnvFile {
            path: env_path.display().to_string(),
            message: e.to_string(),
        })?;
        for item in iter {
            let (key, value) = item.map_err(|e| ContextError::EnvFile {
                path: env_path.display().to_string(),
                message: e.to_string(),
            })?;
            file_values.insert(key, value);
        }
        debug!("Loaded {} values from {:?}", file_values.len(), env_path);
    } else {
        debug!("No .env file found at {:?}", env_path);
    }

    let mut merged = file_values.clone();
    merged.extend(process_env);

    Ok(EnvironmentData {
        env_file: env_path.exists().then_some(env_path),
        file_values,
        merged,
    })
}
