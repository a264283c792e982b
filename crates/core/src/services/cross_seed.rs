//! Cross-Seed: rewrites the arrays in `config/cross-seed/config.js`.
//!
//! The file is JavaScript, so it is edited textually: each managed key's
//! array literal is replaced wholesale and everything else is left alone.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex_lite::{Captures, Regex};
use tracing::{info, warn};

use super::error::ServiceError;
use crate::command::{CommandRunner, CommandSpec};

const TEMPLATE: &str = r#""use strict";
module.exports = {
    apiKey: undefined,
    torznab: [],
    sonarr: [],
    radarr: [],
    torrentClients: [],
    useClientTorrents: true,
    delay: 30,
    linkCategory: "cross-seed-link",
    linkDirs: [],
    linkType: "hardlink",
    flatLinking: false,
    matchMode: "partial",
    seasonFromEpisodes: null,
};
"#;

const CONTAINER_CONFIG_PATH: &str = "cross-seed:/config/config.js";

/// Values for the managed arrays.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrossSeedTargets {
    pub torznab: Vec<String>,
    pub sonarr: Vec<String>,
    pub radarr: Vec<String>,
    pub torrent_clients: Vec<String>,
    pub link_dirs: Vec<String>,
}

fn format_array(values: &[String]) -> String {
    let values: Vec<String> = values
        .iter()
        .filter(|v| !v.is_empty())
        .map(|v| format!("        {}", serde_json::Value::String(v.clone())))
        .collect();
    if values.is_empty() {
        return String::new();
    }
    format!("\n{}\n    ", values.join(",\n"))
}

fn replace_array(text: &str, key: &str, values: &[String]) -> Result<String, ServiceError> {
    let pattern = format!(r"(?s)(\b{}\s*:\s*\[)(.*?)(\])", key);
    let re = Regex::new(&pattern).map_err(|e| ServiceError::InvalidResponse(e.to_string()))?;
    let formatted = format_array(values);
    Ok(re
        .replace(text, |caps: &Captures| format!("{}{}{}", &caps[1], formatted, &caps[3]))
        .into_owned())
}

fn replace_scalar(text: &str, key: &str, value: &str) -> Result<String, ServiceError> {
    let pattern = format!(r"(\b{}\s*:\s*)([^,\n]*)(,)", key);
    let re = Regex::new(&pattern).map_err(|e| ServiceError::InvalidResponse(e.to_string()))?;
    Ok(re
        .replace(text, |caps: &Captures| format!("{}{}{}", &caps[1], value, &caps[3]))
        .into_owned())
}

pub struct CrossSeedConfigurator {
    config_path: PathBuf,
    runner: Arc<dyn CommandRunner>,
    docker: String,
    dry_run: bool,
}

impl CrossSeedConfigurator {
    pub fn new(root_dir: &Path, runner: Arc<dyn CommandRunner>, docker: &str, dry_run: bool) -> Self {
        Self {
            config_path: root_dir.join("config").join("cross-seed").join("config.js"),
            runner,
            docker: docker.to_string(),
            dry_run,
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Render the updated config, starting from the stock template when no
    /// file exists yet.
    pub fn render(&self, targets: &CrossSeedTargets) -> Result<(String, String), ServiceError> {
        let original = if self.config_path.exists() {
            std::fs::read_to_string(&self.config_path).map_err(|e| ServiceError::io(&self.config_path, e))?
        } else {
            TEMPLATE.to_string()
        };

        let mut text = original.clone();
        for (key, values) in [
            ("torznab", &targets.torznab),
            ("sonarr", &targets.sonarr),
            ("radarr", &targets.radarr),
            ("torrentClients", &targets.torrent_clients),
            ("linkDirs", &targets.link_dirs),
        ] {
            text = replace_array(&text, key, values)?;
        }
        text = replace_scalar(&text, "seasonFromEpisodes", "null")?;
        Ok((original, text))
    }

    /// Returns whether the file content changed.
    pub async fn ensure_config(&self, targets: &CrossSeedTargets) -> Result<bool, ServiceError> {
        let (original, updated) = self.render(targets)?;
        if original == updated && self.config_path.exists() {
            info!("Cross-Seed: Configuration already up to date");
            return Ok(false);
        }
        if self.dry_run {
            info!("[dry-run] Cross-Seed: would update config.js");
            return Ok(true);
        }

        match self.write_local(&updated) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                warn!("Cross-Seed: Host config not writable; updating via docker cp");
                self.write_via_docker(&updated).await?;
            }
            Err(e) => return Err(ServiceError::io(&self.config_path, e)),
        }
        info!("Cross-Seed: Updated config.js");
        Ok(true)
    }

    fn write_local(&self, text: &str) -> std::io::Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.config_path, text)
    }

    async fn write_via_docker(&self, text: &str) -> Result<(), ServiceError> {
        let mut tmp = tempfile::NamedTempFile::new().map_err(|e| ServiceError::io(Path::new("<tempfile>"), e))?;
        tmp.write_all(text.as_bytes())
            .and_then(|_| tmp.flush())
            .map_err(|e| ServiceError::io(tmp.path(), e))?;

        let spec = CommandSpec::new(&self.docker)
            .arg("cp")
            .arg(tmp.path().display().to_string())
            .arg(CONTAINER_CONFIG_PATH);
        self.runner.run(&spec).await?;
        Ok(())
    }
}
