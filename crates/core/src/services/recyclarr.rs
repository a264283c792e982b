//! Recyclarr: keeps `config/recyclarr/recyclarr.yml` pointing at both
//! content managers and triggers a sync inside its container.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_yaml::{Mapping, Value};
use tracing::{error, info};

use super::error::ServiceError;
use crate::command::{CommandRunner, CommandSpec};

const SCHEMA_HEADER: &str = "# yaml-language-server: $schema=https://raw.githubusercontent.com/recyclarr/recyclarr/master/schemas/config-schema.json";

pub struct RecyclarrManager {
    config_path: PathBuf,
    runner: Arc<dyn CommandRunner>,
    docker: String,
    dry_run: bool,
}

fn key(name: &str) -> Value {
    Value::String(name.to_string())
}

fn instance(base_url: &str, api_key: &str, quality_type: &str) -> Mapping {
    let mut quality = Mapping::new();
    quality.insert(key("type"), key(quality_type));

    let mut entry = Mapping::new();
    entry.insert(key("base_url"), key(base_url));
    entry.insert(key("api_key"), key(api_key));
    entry.insert(key("quality_definition"), Value::Mapping(quality));
    entry
}

/// Merge `settings` into `root[section][name]`, returning whether anything
/// differed. Keys the user added by hand are kept.
fn merge_instance(root: &mut Mapping, section: &str, name: &str, settings: Mapping) -> bool {
    let section_value = root
        .entry(key(section))
        .or_insert_with(|| Value::Mapping(Mapping::new()));
    if !section_value.is_mapping() {
        *section_value = Value::Mapping(Mapping::new());
    }
    let Value::Mapping(section_map) = section_value else {
        return false;
    };

    let instance_value = section_map
        .entry(key(name))
        .or_insert_with(|| Value::Mapping(Mapping::new()));
    if !instance_value.is_mapping() {
        *instance_value = Value::Mapping(Mapping::new());
    }
    let Value::Mapping(instance_map) = instance_value else {
        return false;
    };

    let mut updated = false;
    for (k, v) in settings {
        if instance_map.get(&k) != Some(&v) {
            instance_map.insert(k, v);
            updated = true;
        }
    }
    updated
}

impl RecyclarrManager {
    pub fn new(root_dir: &Path, runner: Arc<dyn CommandRunner>, docker: &str, dry_run: bool) -> Self {
        Self {
            config_path: root_dir.join("config").join("recyclarr").join("recyclarr.yml"),
            runner,
            docker: docker.to_string(),
            dry_run,
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    fn load(&self) -> Result<Mapping, ServiceError> {
        if !self.config_path.exists() {
            return Ok(Mapping::new());
        }
        let text = std::fs::read_to_string(&self.config_path).map_err(|e| ServiceError::io(&self.config_path, e))?;
        match serde_yaml::from_str::<Value>(&text) {
            Ok(Value::Mapping(map)) => Ok(map),
            Ok(Value::Null) => Ok(Mapping::new()),
            Ok(_) => Err(ServiceError::io(&self.config_path, "top level is not a mapping")),
            Err(e) => Err(ServiceError::io(&self.config_path, format!("failed to parse: {}", e))),
        }
    }

    /// Point the `sonarr.sonarr` and `radarr.radarr` instances at the
    /// containers with the given API keys.
    pub fn ensure_config(&self, sonarr_api_key: &str, radarr_api_key: &str) -> Result<bool, ServiceError> {
        let mut config = self.load()?;
        let mut changed = false;
        changed |= merge_instance(
            &mut config,
            "sonarr",
            "sonarr",
            instance("http://sonarr:8989", sonarr_api_key, "series"),
        );
        changed |= merge_instance(
            &mut config,
            "radarr",
            "radarr",
            instance("http://radarr:7878", radarr_api_key, "movie"),
        );

        if !changed {
            info!("Recyclarr: Configuration already up to date");
            return Ok(false);
        }
        if self.dry_run {
            info!("[dry-run] Recyclarr: would update recyclarr.yml");
            return Ok(true);
        }

        let body = serde_yaml::to_string(&Value::Mapping(config))
            .map_err(|e| ServiceError::io(&self.config_path, e))?;
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ServiceError::io(parent, e))?;
        }
        std::fs::write(&self.config_path, format!("{}\n{}", SCHEMA_HEADER, body))
            .map_err(|e| ServiceError::io(&self.config_path, e))?;
        info!("Recyclarr: Updated recyclarr.yml");
        Ok(true)
    }

    /// `docker exec recyclarr recyclarr sync`.
    pub async fn run_sync(&self) -> Result<(), ServiceError> {
        let spec = CommandSpec::new(&self.docker).args(["exec", "recyclarr", "recyclarr", "sync"]);
        if self.dry_run {
            info!("[dry-run] Recyclarr: would run `{}`", spec.display());
            return Ok(());
        }
        match self.runner.run(&spec).await {
            Ok(_) => {
                info!("Recyclarr: Sync completed");
                Ok(())
            }
            Err(e) => {
                error!("Recyclarr sync failed: {}", e.stderr());
                Err(e.into())
            }
        }
    }
}
