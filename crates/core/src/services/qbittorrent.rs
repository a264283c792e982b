//! qBittorrent WebUI API client.
//!
//! Authentication is cookie based: a successful login stores the `SID`
//! cookie in the transport's jar and later calls ride on it.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use super::api::ServiceApi;
use super::error::ServiceError;
use super::transport::{ApiRequest, HttpTransport};
use crate::retry::RetryPolicy;

pub const DEFAULT_QBIT_USERNAME: &str = "admin";
pub const DEFAULT_QBIT_PASSWORD: &str = "adminadmin";

/// Docker bridge networks the other containers connect from.
const BASE_WHITELIST: &str = "127.0.0.1/32\n172.18.0.0/16\n172.19.0.0/16";

#[derive(Debug, Deserialize)]
struct Category {
    #[serde(rename = "savePath", default)]
    save_path: String,
}

pub struct QbittorrentClient {
    api: ServiceApi,
    dry_run: bool,
}

impl QbittorrentClient {
    pub fn new(base_url: &str, transport: Arc<dyn HttpTransport>, retry: RetryPolicy, dry_run: bool) -> Self {
        Self {
            api: ServiceApi::new("qBittorrent", base_url, transport, retry),
            dry_run,
        }
    }

    /// Returns whether the WebUI accepted the credentials.
    async fn login(&self, username: &str, password: &str) -> Result<bool, ServiceError> {
        let request = ApiRequest::post(self.api.url("/api/v2/auth/login"))
            .form([("username", username), ("password", password)]);
        let response = self.api.execute_raw(request).await?;
        let ok = response.body.trim().eq_ignore_ascii_case("ok.");
        if !ok {
            debug!(
                "qBittorrent login failed for user {}: HTTP {} {}",
                username,
                response.status,
                response.body.chars().take(100).collect::<String>()
            );
        }
        Ok(ok)
    }

    async fn preferences(&self) -> Result<Map<String, Value>, ServiceError> {
        self.api.get_json("/api/v2/app/preferences").await
    }

    async fn set_preferences(&self, preferences: Value) -> Result<(), ServiceError> {
        self.api
            .post_form("/api/v2/app/setPreferences", [("json", preferences.to_string())])
            .await?;
        Ok(())
    }

    /// Apply only the entries of `desired` that differ from `current`.
    async fn apply_preferences(
        &self,
        current: &Map<String, Value>,
        desired: Map<String, Value>,
    ) -> Result<bool, ServiceError> {
        let diff: Map<String, Value> = desired
            .into_iter()
            .filter(|(key, value)| current.get(key) != Some(value))
            .collect();
        if diff.is_empty() {
            return Ok(false);
        }
        debug!("Updating qBittorrent preferences: {:?}", diff.keys().collect::<Vec<_>>());
        self.set_preferences(Value::Object(diff)).await?;
        Ok(true)
    }

    /// Switch the WebUI to the shared credentials and open auth bypass for
    /// the local and Docker networks.
    ///
    /// Logs in with the shared credentials first; a fresh install only
    /// accepts the factory default login.
    pub async fn ensure_credentials(
        &self,
        username: &str,
        password: &str,
        lan_subnet: Option<&str>,
    ) -> Result<bool, ServiceError> {
        if self.dry_run {
            info!("[dry-run] Would sync qBittorrent credentials and auth bypass");
            return Ok(false);
        }

        let mut changed = false;
        if self.login(username, password).await? {
            info!("qBittorrent: Credentials already match bootstrap user");
        } else if self.login(DEFAULT_QBIT_USERNAME, DEFAULT_QBIT_PASSWORD).await? {
            info!("qBittorrent: Updating WebUI credentials to bootstrap user");
            self.set_preferences(json!({
                "web_ui_username": username,
                "web_ui_password": password,
            }))
            .await?;
            // Refresh the session under the new identity.
            if !self.login(username, password).await? {
                return Err(ServiceError::AuthenticationFailed(
                    "qBittorrent rejected the updated credentials".to_string(),
                ));
            }
            changed = true;
        } else {
            return Err(ServiceError::AuthenticationFailed(
                "Unable to authenticate with qBittorrent; cannot configure preferences.".to_string(),
            ));
        }

        let mut whitelist = BASE_WHITELIST.to_string();
        if let Some(subnet) = lan_subnet.filter(|s| !s.trim().is_empty()) {
            whitelist.push('\n');
            whitelist.push_str(subnet.trim());
        }

        let current = self.preferences().await?;
        let desired = json!({
            "web_ui_address": "*",
            "web_ui_host_header_validation_enabled": false,
            "bypass_local_auth": true,
            "bypass_auth_subnet_whitelist_enabled": true,
            "bypass_auth_subnet_whitelist": whitelist,
        });
        if let Value::Object(desired) = desired {
            if self.apply_preferences(&current, desired).await? {
                info!("qBittorrent: Authentication bypass configured for LAN + Docker networks");
                changed = true;
            }
        }
        Ok(changed)
    }

    /// Default save/temp paths under `downloads_dir`, plus one category per
    /// content manager saving into its own completed folder.
    pub async fn ensure_storage_layout(
        &self,
        downloads_dir: &str,
        categories: &[&str],
    ) -> Result<bool, ServiceError> {
        let downloads = downloads_dir.trim_end_matches('/');
        let completed = format!("{}/completed", downloads);
        if self.dry_run {
            info!("[dry-run] Would point qBittorrent downloads at {}", completed);
            return Ok(false);
        }

        let current = self.preferences().await?;
        let mut desired = Map::new();
        desired.insert("save_path".to_string(), json!(completed));
        desired.insert("temp_path_enabled".to_string(), json!(true));
        desired.insert("temp_path".to_string(), json!(format!("{}/incomplete", downloads)));
        let mut changed = self.apply_preferences(&current, desired).await?;

        let existing: HashMap<String, Category> = self.api.get_json("/api/v2/torrents/categories").await?;
        for category in categories {
            let save_path = format!("{}/{}", completed, category);
            let endpoint = match existing.get(*category) {
                Some(c) if c.save_path.trim_end_matches('/') == save_path => continue,
                Some(_) => "/api/v2/torrents/editCategory",
                None => "/api/v2/torrents/createCategory",
            };
            self.api
                .post_form(endpoint, [("category", category.to_string()), ("savePath", save_path)])
                .await?;
            info!("qBittorrent: Category {} configured", category);
            changed = true;
        }
        Ok(changed)
    }

    /// Set the BitTorrent listening port (used for VPN port forwarding).
    pub async fn set_listen_port(&self, port: u16) -> Result<bool, ServiceError> {
        if self.dry_run {
            info!("[dry-run] Would set qBittorrent listen port to {}", port);
            return Ok(false);
        }
        let current = self.preferences().await?;
        let mut desired = Map::new();
        desired.insert("listen_port".to_string(), json!(port));
        let changed = self.apply_preferences(&current, desired).await?;
        if changed {
            info!("qBittorrent: Listen port set to {}", port);
        }
        Ok(changed)
    }
}
