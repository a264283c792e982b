//! Sonarr/Radarr (v3 API) client.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::info;

use super::api::{field_value, find_by_implementation, set_field, ServiceApi};
use super::error::ServiceError;
use super::transport::HttpTransport;
use crate::retry::RetryPolicy;

const API: &str = "/api/v3";
const QBIT_IMPLEMENTATION: &str = "QBittorrent";

/// How a content manager should reach qBittorrent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadClientSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub category: String,
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Sonarr or Radarr.
pub struct ArrClient {
    api: ServiceApi,
    dry_run: bool,
}

impl ArrClient {
    pub fn new(
        name: &str,
        base_url: &str,
        api_key: &str,
        transport: Arc<dyn HttpTransport>,
        retry: RetryPolicy,
        dry_run: bool,
    ) -> Self {
        Self {
            api: ServiceApi::new(name, base_url, transport, retry).with_auth_header("X-Api-Key", api_key),
            dry_run,
        }
    }

    pub fn name(&self) -> &str {
        self.api.name()
    }

    /// Register qBittorrent as a download client, updating an existing one
    /// in place when its settings drifted.
    pub async fn ensure_qbittorrent_download_client(
        &self,
        settings: &DownloadClientSettings,
    ) -> Result<bool, ServiceError> {
        if self.dry_run {
            info!("[dry-run] {}: would ensure qBittorrent download client", self.name());
            return Ok(false);
        }

        let clients: Vec<Value> = self.api.get_json(&format!("{}/downloadclient", API)).await?;
        let existing = find_qbit_client(&clients, settings);

        if let Some(existing) = existing {
            if download_client_matches(existing, settings) {
                return Ok(false);
            }
        }

        let mut payload = self.qbit_payload(settings).await?;
        match existing.and_then(|c| c.get("id").cloned()) {
            Some(id) => {
                payload["id"] = id.clone();
                self.api
                    .put_json(&format!("{}/downloadclient/{}", API, id), payload)
                    .await?;
            }
            None => {
                self.api.post_json(&format!("{}/downloadclient", API), payload).await?;
            }
        }
        info!("{}: qBittorrent download client synchronized", self.name());
        Ok(true)
    }

    async fn qbit_payload(&self, settings: &DownloadClientSettings) -> Result<Value, ServiceError> {
        let schemas: Vec<Value> = self
            .api
            .get_json(&format!("{}/downloadclient/schema", API))
            .await?;
        let mut schema = find_by_implementation(&schemas, QBIT_IMPLEMENTATION)
            .cloned()
            .ok_or_else(|| ServiceError::Schema(format!("{}: qBittorrent schema not found", self.name())))?;

        set_field(&mut schema, "host", json!(settings.host));
        set_field(&mut schema, "port", json!(settings.port));
        set_field(&mut schema, "username", json!(settings.username));
        set_field(&mut schema, "password", json!(settings.password));
        set_field(&mut schema, "category", json!(settings.category));
        set_field(&mut schema, "useSsl", json!(false));
        set_field(&mut schema, "urlBase", json!(""));
        set_field(&mut schema, "addPaused", json!(false));
        set_field(&mut schema, "initialState", json!(0));

        if let Some(obj) = schema.as_object_mut() {
            obj.insert("name".to_string(), json!("qBittorrent"));
            obj.insert("enable".to_string(), json!(true));
            obj.insert("protocol".to_string(), json!("torrent"));
            obj.insert("priority".to_string(), json!(1));
            obj.insert("removeCompletedDownloads".to_string(), json!(false));
            obj.insert("removeFailedDownloads".to_string(), json!(false));
        }
        Ok(schema)
    }

    /// Make sure `path` is registered as a root folder.
    pub async fn ensure_root_folder(&self, path: &str) -> Result<bool, ServiceError> {
        let target = normalize_path(path);
        if self.dry_run {
            info!("[dry-run] {}: would ensure root folder {}", self.name(), target);
            return Ok(false);
        }

        let folders: Vec<Value> = self.api.get_json(&format!("{}/rootfolder", API)).await?;
        let exists = folders.iter().any(|folder| {
            folder
                .get("path")
                .and_then(Value::as_str)
                .map(|p| normalize_path(p) == target)
                .unwrap_or(false)
        });
        if exists {
            return Ok(false);
        }

        self.api
            .post_json(&format!("{}/rootfolder", API), json!({ "path": target }))
            .await?;
        info!("{}: Root folder registered at {}", self.name(), target);
        Ok(true)
    }

    /// Require forms login with the shared credentials.
    pub async fn ensure_ui_credentials(&self, username: &str, password: &str) -> Result<bool, ServiceError> {
        ensure_host_auth(&self.api, API, username, password, "enabled", self.dry_run).await
    }
}

fn find_qbit_client<'a>(clients: &'a [Value], settings: &DownloadClientSettings) -> Option<&'a Value> {
    let mut qbit = clients
        .iter()
        .filter(|c| c.get("implementation").and_then(Value::as_str) == Some(QBIT_IMPLEMENTATION));
    let first = qbit.clone().next();
    qbit.find(|c| {
        field_value(c, "host").and_then(Value::as_str) == Some(settings.host.as_str())
            && field_value(c, "category").and_then(Value::as_str) == Some(settings.category.as_str())
    })
    .or(first)
}

// The API never echoes the password back, so it cannot take part in the
// comparison.
fn download_client_matches(client: &Value, settings: &DownloadClientSettings) -> bool {
    client.get("enable").and_then(Value::as_bool) == Some(true)
        && field_value(client, "host").and_then(Value::as_str) == Some(settings.host.as_str())
        && field_value(client, "port").and_then(Value::as_u64) == Some(u64::from(settings.port))
        && field_value(client, "category").and_then(Value::as_str) == Some(settings.category.as_str())
        && field_value(client, "username").and_then(Value::as_str).unwrap_or("") == settings.username
}

/// Shared by the *arr family: `config/host` carries the UI auth settings.
/// `required` is the `authenticationRequired` value to enforce.
pub(crate) async fn ensure_host_auth(
    api: &ServiceApi,
    prefix: &str,
    username: &str,
    password: &str,
    required: &str,
    dry_run: bool,
) -> Result<bool, ServiceError> {
    if dry_run {
        info!("[dry-run] Would configure UI credentials for {}", api.name());
        return Ok(false);
    }

    let path = format!("{}/config/host", prefix);
    let mut host: Value = api.get_json(&path).await?;
    let up_to_date = host.get("authenticationMethod").and_then(Value::as_str) == Some("forms")
        && host.get("username").and_then(Value::as_str) == Some(username)
        && host.get("authenticationRequired").and_then(Value::as_str) == Some(required);
    if up_to_date {
        return Ok(false);
    }

    let obj = host
        .as_object_mut()
        .ok_or_else(|| ServiceError::InvalidResponse(format!("{}: host config is not an object", api.name())))?;
    obj.insert("authenticationMethod".to_string(), json!("forms"));
    obj.insert("authenticationRequired".to_string(), json!(required));
    obj.insert("username".to_string(), json!(username));
    obj.insert("password".to_string(), json!(password));
    obj.insert("passwordConfirmation".to_string(), json!(password));

    api.put_json(&path, host).await?;
    info!("{}: UI credentials configured", api.name());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::transport::{ApiResponse, Method};
    use crate::testing::MockTransport;

    fn client(transport: Arc<MockTransport>) -> ArrClient {
        ArrClient::new(
            "Sonarr",
            "http://127.0.0.1:8989/",
            "key",
            transport,
            RetryPolicy::new(1, std::time::Duration::ZERO),
            false,
        )
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/data/tv/"), "/data/tv");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path("/data/tv"), "/data/tv");
    }

    #[tokio::test]
    async fn test_root_folder_already_registered() {
        let transport = Arc::new(MockTransport::new());
        transport.on(Method::Get, "/api/v3/rootfolder", |_| {
            ApiResponse::ok_json(&json!([{ "id": 1, "path": "/data/tv/" }]))
        });
        let changed = client(transport.clone()).ensure_root_folder("/data/tv").await.unwrap();
        assert!(!changed);
        assert!(transport.mutating_requests().is_empty());
        let req = &transport.requests()[0];
        assert!(req.headers.contains(&("X-Api-Key".to_string(), "key".to_string())));
        assert_eq!(req.url, "http://127.0.0.1:8989/api/v3/rootfolder");
    }

    #[tokio::test]
    async fn test_root_folder_created() {
        let transport = Arc::new(MockTransport::new());
        transport.on(Method::Get, "/api/v3/rootfolder", |_| ApiResponse::ok_json(&json!([])));
        transport.on(Method::Post, "/api/v3/rootfolder", |_| ApiResponse::new(201, "{}"));
        assert!(client(transport.clone()).ensure_root_folder("/data/tv").await.unwrap());
        let posted = transport.mutating_requests();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].json_body(), Some(&json!({ "path": "/data/tv" })));
    }

    #[tokio::test]
    async fn test_dry_run_issues_no_requests() {
        let transport = Arc::new(MockTransport::new());
        let client = ArrClient::new(
            "Radarr",
            "http://127.0.0.1:7878",
            "key",
            transport.clone(),
            RetryPolicy::default(),
            true,
        );
        assert!(!client.ensure_root_folder("/data/movies").await.unwrap());
        assert!(!client.ensure_ui_credentials("u", "p").await.unwrap());
        assert!(transport.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_root_folder_survives_startup_rejections() {
        let transport = Arc::new(MockTransport::new());
        let calls = std::sync::atomic::AtomicUsize::new(0);
        transport.on(Method::Get, "/api/v3/rootfolder", move |_| {
            if calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst) < 2 {
                ApiResponse::new(401, "Unauthorized")
            } else {
                ApiResponse::ok_json(&json!([{ "id": 1, "path": "/data/tv" }]))
            }
        });
        let client = ArrClient::new(
            "Sonarr",
            "http://127.0.0.1:8989",
            "key",
            transport.clone(),
            RetryPolicy::new(5, std::time::Duration::from_secs(3)),
            false,
        );

        assert!(!client.ensure_root_folder("/data/tv").await.unwrap());
        assert_eq!(transport.requests().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_schema_fails_without_retry() {
        let transport = Arc::new(MockTransport::new());
        transport.on(Method::Get, "/api/v3/downloadclient", |_| ApiResponse::ok_json(&json!([])));
        transport.on(Method::Get, "/api/v3/downloadclient/schema", |_| ApiResponse::ok_json(&json!([])));
        let client = ArrClient::new(
            "Sonarr",
            "http://127.0.0.1:8989",
            "key",
            transport.clone(),
            RetryPolicy::new(5, std::time::Duration::from_secs(3)),
            false,
        );
        let settings = DownloadClientSettings {
            host: "qbittorrent".to_string(),
            port: 8080,
            username: String::new(),
            password: String::new(),
            category: "sonarr-tv".to_string(),
        };

        let err = client.ensure_qbittorrent_download_client(&settings).await.unwrap_err();

        assert!(matches!(err, ServiceError::Schema(_)));
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_schema_is_error() {
        let transport = Arc::new(MockTransport::new());
        transport.on(Method::Get, "/api/v3/downloadclient", |_| ApiResponse::ok_json(&json!([])));
        transport.on(Method::Get, "/api/v3/downloadclient/schema", |_| {
            ApiResponse::ok_json(&json!([{ "implementation": "Transmission", "fields": [] }]))
        });
        let settings = DownloadClientSettings {
            host: "gluetun".to_string(),
            port: 8080,
            username: "u".to_string(),
            password: "p".to_string(),
            category: "sonarr-tv".to_string(),
        };
        let err = client(transport)
            .ensure_qbittorrent_download_client(&settings)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Schema(_)));
    }

    #[tokio::test]
    async fn test_ui_credentials_update_preserves_host_fields() {
        let transport = Arc::new(MockTransport::new());
        transport.on(Method::Get, "/api/v3/config/host", |_| {
            ApiResponse::ok_json(&json!({ "id": 1, "port": 8989, "authenticationMethod": "none" }))
        });
        transport.on(Method::Put, "/api/v3/config/host", |_| ApiResponse::new(202, "{}"));
        assert!(client(transport.clone()).ensure_ui_credentials("user", "pw").await.unwrap());

        let put = &transport.mutating_requests()[0];
        let body = put.json_body().unwrap();
        assert_eq!(body["port"], 8989);
        assert_eq!(body["authenticationMethod"], "forms");
        assert_eq!(body["authenticationRequired"], "enabled");
        assert_eq!(body["passwordConfirmation"], "pw");
    }
}
