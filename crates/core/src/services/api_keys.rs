//! API keys written by the applications into their own config files.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use super::ServiceId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiKeyError {
    #[error("Config file not found at {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Unable to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("No API key defined in {}", path.display())]
    Missing { path: PathBuf },
}

impl ApiKeyError {
    pub fn path(&self) -> &Path {
        match self {
            ApiKeyError::NotFound { path }
            | ApiKeyError::Parse { path, .. }
            | ApiKeyError::Missing { path } => path,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename = "Config")]
struct ArrConfigXml {
    #[serde(rename = "ApiKey", default)]
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BazarrConfigYaml {
    #[serde(default)]
    auth: Option<BazarrAuth>,
}

#[derive(Debug, Deserialize)]
struct BazarrAuth {
    #[serde(default)]
    apikey: Option<String>,
}

fn read(path: &Path) -> Result<String, ApiKeyError> {
    if !path.exists() {
        return Err(ApiKeyError::NotFound {
            path: path.to_path_buf(),
        });
    }
    std::fs::read_to_string(path).map_err(|e| ApiKeyError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn non_empty(value: Option<String>, path: &Path) -> Result<String, ApiKeyError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiKeyError::Missing {
            path: path.to_path_buf(),
        })
}

fn read_xml_api_key(path: &Path) -> Result<String, ApiKeyError> {
    let text = read(path)?;
    let config: ArrConfigXml = quick_xml::de::from_str(&text).map_err(|e| ApiKeyError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    non_empty(config.api_key, path)
}

/// `config/<service>/config.xml` → `<ApiKey>`.
pub fn read_arr_api_key(root_dir: &Path, service: ServiceId) -> Result<String, ApiKeyError> {
    read_xml_api_key(&root_dir.join("config").join(service.as_str()).join("config.xml"))
}

pub fn read_prowlarr_api_key(root_dir: &Path) -> Result<String, ApiKeyError> {
    read_arr_api_key(root_dir, ServiceId::Prowlarr)
}

/// `config/bazarr/config/config.yaml` → `auth.apikey`.
pub fn read_bazarr_api_key(root_dir: &Path) -> Result<String, ApiKeyError> {
    let path = root_dir
        .join("config")
        .join("bazarr")
        .join("config")
        .join("config.yaml");
    let text = read(&path)?;
    let config: BazarrConfigYaml = serde_yaml::from_str(&text).map_err(|e| ApiKeyError::Parse {
        path: path.clone(),
        message: e.to_string(),
    })?;
    non_empty(config.auth.and_then(|a| a.apikey), &path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_reads_arr_key() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "config/sonarr/config.xml",
            "<Config>\n  <Port>8989</Port>\n  <ApiKey> abc123 </ApiKey>\n  <UrlBase></UrlBase>\n</Config>",
        );
        assert_eq!(read_arr_api_key(dir.path(), ServiceId::Sonarr).unwrap(), "abc123");
    }

    #[test]
    fn test_missing_file_names_path() {
        let dir = TempDir::new().unwrap();
        let err = read_arr_api_key(dir.path(), ServiceId::Radarr).unwrap_err();
        assert!(matches!(err, ApiKeyError::NotFound { .. }));
        assert!(err.path().ends_with("config/radarr/config.xml"));
        assert!(err.to_string().contains("config/radarr/config.xml"));
    }

    #[test]
    fn test_xml_without_key() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "config/prowlarr/config.xml", "<Config><Port>9696</Port></Config>");
        let err = read_prowlarr_api_key(dir.path()).unwrap_err();
        assert!(matches!(err, ApiKeyError::Missing { .. }));
    }

    #[test]
    fn test_malformed_xml() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "config/sonarr/config.xml", "<Config><ApiKey>abc</Config>");
        let err = read_arr_api_key(dir.path(), ServiceId::Sonarr).unwrap_err();
        assert!(matches!(err, ApiKeyError::Parse { .. }));
    }

    #[test]
    fn test_reads_bazarr_key() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "config/bazarr/config/config.yaml",
            "general:\n  port: 6767\nauth:\n  type: null\n  apikey: bz-key\n",
        );
        assert_eq!(read_bazarr_api_key(dir.path()).unwrap(), "bz-key");
    }

    #[test]
    fn test_bazarr_without_auth_section() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "config/bazarr/config/config.yaml", "general:\n  port: 6767\n");
        let err = read_bazarr_api_key(dir.path()).unwrap_err();
        assert!(matches!(err, ApiKeyError::Missing { .. }));
    }
}
