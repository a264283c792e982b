//! Prowlarr (v1 API) client.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::api::{field_value, find_by_implementation, set_field, ServiceApi};
use super::arr::ensure_host_auth;
use super::error::ServiceError;
use super::transport::HttpTransport;
use crate::retry::RetryPolicy;

const API: &str = "/api/v1";
const FLARESOLVERR: &str = "FlareSolverr";

/// An indexer as listed by Prowlarr.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IndexerSummary {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub enable: bool,
}

pub struct ProwlarrClient {
    api: ServiceApi,
    api_key: String,
    dry_run: bool,
}

impl ProwlarrClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        transport: Arc<dyn HttpTransport>,
        retry: RetryPolicy,
        dry_run: bool,
    ) -> Self {
        Self {
            api: ServiceApi::new("Prowlarr", base_url, transport, retry).with_auth_header("X-Api-Key", api_key),
            api_key: api_key.to_string(),
            dry_run,
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Link an application (Sonarr, Radarr) so Prowlarr pushes indexers to it.
    ///
    /// `fields` are applied on top of the implementation's schema.
    pub async fn ensure_application(
        &self,
        implementation: &str,
        fields: &[(&str, Value)],
    ) -> Result<bool, ServiceError> {
        if self.dry_run {
            info!("[dry-run] Would configure {} in Prowlarr", implementation);
            return Ok(false);
        }

        let apps: Vec<Value> = self.api.get_json(&format!("{}/applications", API)).await?;
        let existing = find_by_implementation(&apps, implementation);
        if let Some(app) = existing {
            let matches = app.get("enable").and_then(Value::as_bool) == Some(true)
                && fields
                    .iter()
                    .all(|(name, value)| field_value(app, name) == Some(value));
            if matches {
                return Ok(false);
            }
        }

        let schemas: Vec<Value> = self
            .api
            .get_json(&format!("{}/applications/schema", API))
            .await?;
        let mut payload = find_by_implementation(&schemas, implementation)
            .cloned()
            .ok_or_else(|| ServiceError::Schema(format!("Prowlarr schema for {} not found", implementation)))?;
        for (name, value) in fields {
            set_field(&mut payload, name, value.clone());
        }
        if let Some(obj) = payload.as_object_mut() {
            obj.insert("name".to_string(), json!(implementation));
            obj.insert("enable".to_string(), json!(true));
            obj.entry("tags").or_insert_with(|| json!([]));
            obj.entry("syncLevel").or_insert_with(|| json!("fullSync"));
        }

        match existing.and_then(|app| app.get("id").cloned()) {
            Some(id) => {
                payload["id"] = id.clone();
                self.api
                    .put_json(&format!("{}/applications/{}", API, id), payload)
                    .await?;
                info!("Prowlarr: Updated {} application", implementation);
            }
            None => {
                self.api.post_json(&format!("{}/applications", API), payload).await?;
                info!("Prowlarr: Created {} application", implementation);
            }
        }
        Ok(true)
    }

    /// Point Prowlarr's FlareSolverr indexer proxy at `url`.
    pub async fn ensure_flaresolverr_proxy(&self, url: &str) -> Result<bool, ServiceError> {
        let host = if url.ends_with('/') {
            url.to_string()
        } else {
            format!("{}/", url)
        };
        if self.dry_run {
            info!("[dry-run] Would configure FlareSolverr proxy at {}", host);
            return Ok(false);
        }

        let proxies: Vec<Value> = self.api.get_json(&format!("{}/indexerProxy", API)).await?;
        let existing = find_by_implementation(&proxies, FLARESOLVERR);
        if let Some(proxy) = existing {
            if field_value(proxy, "host").and_then(Value::as_str) == Some(host.as_str()) {
                return Ok(false);
            }
        }

        let schemas: Vec<Value> = self
            .api
            .get_json(&format!("{}/indexerProxy/schema", API))
            .await?;
        let mut payload = find_by_implementation(&schemas, FLARESOLVERR)
            .cloned()
            .ok_or_else(|| ServiceError::Schema("FlareSolverr indexer proxy schema not available".to_string()))?;
        set_field(&mut payload, "host", json!(host));
        if let Some(obj) = payload.as_object_mut() {
            obj.insert("name".to_string(), json!(FLARESOLVERR));
            obj.entry("tags").or_insert_with(|| json!([]));
        }

        match existing.and_then(|p| p.get("id").cloned()) {
            Some(id) => {
                payload["id"] = id.clone();
                self.api
                    .put_json(&format!("{}/indexerProxy/{}", API, id), payload)
                    .await?;
            }
            None => {
                self.api.post_json(&format!("{}/indexerProxy", API), payload).await?;
            }
        }
        info!("Prowlarr: FlareSolverr proxy set to {}", host);
        Ok(true)
    }

    pub async fn list_indexers(&self) -> Result<Vec<IndexerSummary>, ServiceError> {
        if self.dry_run {
            return Ok(Vec::new());
        }
        self.api.get_json(&format!("{}/indexer", API)).await
    }

    /// Prowlarr keeps local-network access open while requiring forms login.
    pub async fn ensure_ui_credentials(&self, username: &str, password: &str) -> Result<bool, ServiceError> {
        ensure_host_auth(
            &self.api,
            API,
            username,
            password,
            "disabledForLocalAddresses",
            self.dry_run,
        )
        .await
    }
}
