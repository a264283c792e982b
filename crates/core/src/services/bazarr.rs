//! Bazarr client.
//!
//! Bazarr has no typed settings endpoints: everything is read from
//! `GET /api/system/settings` and written back as a flat form to
//! `POST /api/system/settings`.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::info;

use super::api::ServiceApi;
use super::error::ServiceError;
use super::transport::HttpTransport;
use crate::retry::RetryPolicy;

pub const LANGUAGE_PROFILE_TAG: &str = "servarr-english-default";
pub const LANGUAGE_PROFILE_NAME: &str = "English (auto)";
const ANY_CUTOFF: u32 = 65535;

/// How Bazarr reaches one content manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrConnection {
    pub host: String,
    pub port: u16,
    pub api_key: String,
    pub base_url: String,
    pub use_ssl: bool,
}

fn format_bool(value: bool) -> String {
    if value { "true" } else { "false" }.to_string()
}

/// Settings values come back as bools, numbers or strings depending on the
/// Bazarr version.
fn as_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

pub struct BazarrClient {
    api: ServiceApi,
    dry_run: bool,
}

impl BazarrClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        transport: Arc<dyn HttpTransport>,
        retry: RetryPolicy,
        dry_run: bool,
    ) -> Self {
        Self {
            api: ServiceApi::new("Bazarr", base_url, transport, retry).with_auth_header("X-API-KEY", api_key),
            dry_run,
        }
    }

    async fn settings(&self) -> Result<Value, ServiceError> {
        self.api.get_json("/api/system/settings").await
    }

    /// Connect Bazarr to Sonarr and Radarr, and align its own login with
    /// the shared credentials.
    pub async fn ensure_arr_integrations(
        &self,
        sonarr: &ArrConnection,
        radarr: &ArrConnection,
        credentials: Option<(&str, &str)>,
    ) -> Result<bool, ServiceError> {
        if self.dry_run {
            info!("[dry-run] Would POST Bazarr settings payload");
            return Ok(false);
        }

        let mut payload: Vec<(String, String)> = Vec::new();
        let mut desired: Vec<(&str, &str, String)> = Vec::new();
        for (section, conn) in [("sonarr", sonarr), ("radarr", radarr)] {
            desired.push(("general", if section == "sonarr" { "use_sonarr" } else { "use_radarr" }, format_bool(true)));
            desired.push((section, "ip", conn.host.clone()));
            desired.push((section, "port", conn.port.to_string()));
            desired.push((section, "ssl", format_bool(conn.use_ssl)));
            desired.push((section, "base_url", conn.base_url.clone()));
            desired.push((section, "apikey", conn.api_key.clone()));
        }
        match credentials {
            Some((username, _)) => {
                desired.push(("auth", "type", "form".to_string()));
                desired.push(("auth", "username", username.to_string()));
            }
            None => desired.push(("auth", "type", "none".to_string())),
        }

        let current = self.settings().await?;
        let up_to_date = desired.iter().all(|(section, key, value)| {
            let existing = as_text(current.get(*section).and_then(|s| s.get(*key)));
            // An unset base URL may be reported as "/" or "".
            if *key == "base_url" {
                existing.trim_end_matches('/') == value.trim_end_matches('/')
            } else {
                existing == *value
            }
        });
        if up_to_date {
            return Ok(false);
        }

        for (section, key, value) in desired {
            payload.push((format!("settings-{}-{}", section, key), value));
        }
        if let Some((_, password)) = credentials {
            payload.push(("settings-auth-password".to_string(), password.to_string()));
        }

        self.api.post_form("/api/system/settings", payload).await?;
        info!("Bazarr: Sonarr/Radarr integrations configured");
        Ok(true)
    }

    /// Default every series and movie to an English subtitle profile.
    pub async fn ensure_language_preferences(&self) -> Result<bool, ServiceError> {
        if self.dry_run {
            info!("[dry-run] Would sync Bazarr language profile and defaults");
            return Ok(false);
        }

        let profiles: Vec<Value> = self.api.get_json("/api/system/languages/profiles").await?;
        let languages: Vec<Value> = self.api.get_json("/api/system/languages").await?;
        let settings = self.settings().await?;

        let target = english_profile(&profiles);
        let profile_id = target["profileId"].clone();
        let profile_id_text = as_text(Some(&profile_id));

        let mut enabled: BTreeSet<String> = languages
            .iter()
            .filter(|l| l.get("enabled").and_then(Value::as_bool).unwrap_or(false))
            .filter_map(|l| l.get("code2").and_then(Value::as_str).map(str::to_string))
            .collect();

        let general = settings.get("general");
        let general_is = |key: &str, value: &str| as_text(general.and_then(|g| g.get(key))) == value;
        let up_to_date = enabled.contains("en")
            && profiles.iter().any(|p| profile_matches(p, &target))
            && general_is("serie_default_enabled", "true")
            && general_is("serie_default_profile", &profile_id_text)
            && general_is("movie_default_enabled", "true")
            && general_is("movie_default_profile", &profile_id_text);
        if up_to_date {
            return Ok(false);
        }

        let mut updated = Vec::with_capacity(profiles.len() + 1);
        let mut replaced = false;
        for profile in &profiles {
            let same = profile.get("profileId") == Some(&profile_id)
                || profile.get("tag").and_then(Value::as_str) == Some(LANGUAGE_PROFILE_TAG);
            if same && !replaced {
                updated.push(target.clone());
                replaced = true;
            } else if !same {
                updated.push(profile.clone());
            }
        }
        if !replaced {
            updated.push(target.clone());
        }

        enabled.insert("en".to_string());
        let mut payload: Vec<(String, String)> = enabled
            .into_iter()
            .map(|code| ("languages-enabled".to_string(), code))
            .collect();
        payload.push(("languages-profiles".to_string(), Value::Array(updated).to_string()));
        for key in [
            "serie_default_enabled",
            "movie_default_enabled",
            "embedded_subs_show_desired",
            "use_embedded_subs",
        ] {
            payload.push((format!("settings-general-{}", key), format_bool(true)));
        }
        payload.push(("settings-general-serie_default_profile".to_string(), profile_id_text.clone()));
        payload.push(("settings-general-movie_default_profile".to_string(), profile_id_text));

        self.api.post_form("/api/system/settings", payload).await?;
        info!("Bazarr: English subtitle defaults configured");
        Ok(true)
    }
}

/// Reuse the id of a previously created profile, else take the next free one.
fn select_profile_id(existing: &[Value]) -> i64 {
    let tagged = existing.iter().find_map(|p| {
        (p.get("tag").and_then(Value::as_str) == Some(LANGUAGE_PROFILE_TAG))
            .then(|| p.get("profileId").and_then(Value::as_i64))
            .flatten()
    });
    tagged.unwrap_or_else(|| {
        existing
            .iter()
            .filter_map(|p| p.get("profileId").and_then(Value::as_i64))
            .max()
            .map(|max| max + 1)
            .unwrap_or(1)
    })
}

fn english_profile(existing: &[Value]) -> Value {
    let item = |id: u32, hi: &str| {
        json!({
            "id": id,
            "language": "en",
            "audio_exclude": "False",
            "audio_only_include": "False",
            "hi": hi,
            "forced": "False",
        })
    };
    json!({
        "profileId": select_profile_id(existing),
        "name": LANGUAGE_PROFILE_NAME,
        "cutoff": ANY_CUTOFF,
        "items": [item(1, "False"), item(2, "True")],
        "mustContain": [],
        "mustNotContain": [],
        "originalFormat": false,
        "tag": LANGUAGE_PROFILE_TAG,
    })
}

fn profile_matches(existing: &Value, target: &Value) -> bool {
    ["profileId", "name", "cutoff", "items", "tag"]
        .iter()
        .all(|key| existing.get(*key) == target.get(*key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::transport::{ApiResponse, Method};
    use crate::testing::MockTransport;

    fn client(transport: Arc<MockTransport>) -> BazarrClient {
        BazarrClient::new(
            "http://127.0.0.1:6767",
            "bk",
            transport,
            RetryPolicy::new(1, std::time::Duration::ZERO),
            false,
        )
    }

    fn conn(host: &str, port: u16, key: &str) -> ArrConnection {
        ArrConnection {
            host: host.to_string(),
            port,
            api_key: key.to_string(),
            base_url: String::new(),
            use_ssl: false,
        }
    }

    #[test]
    fn test_select_profile_id() {
        assert_eq!(select_profile_id(&[]), 1);
        assert_eq!(
            select_profile_id(&[json!({ "profileId": 2 }), json!({ "profileId": 5 })]),
            6
        );
        assert_eq!(
            select_profile_id(&[json!({ "profileId": 5 }), json!({ "profileId": 3, "tag": LANGUAGE_PROFILE_TAG })]),
            3
        );
    }

    #[tokio::test]
    async fn test_integrations_posts_form_with_auth() {
        let transport = Arc::new(MockTransport::new());
        transport.on(Method::Get, "/api/system/settings", |_| ApiResponse::ok_json(&json!({})));
        transport.on(Method::Post, "/api/system/settings", |_| ApiResponse::new(204, ""));

        let changed = client(transport.clone())
            .ensure_arr_integrations(&conn("sonarr", 8989, "sk"), &conn("radarr", 7878, "rk"), Some(("u", "p")))
            .await
            .unwrap();
        assert!(changed);

        let post = &transport.mutating_requests()[0];
        assert!(post.headers.contains(&("X-API-KEY".to_string(), "bk".to_string())));
        assert_eq!(post.form_value("settings-sonarr-apikey"), Some("sk"));
        assert_eq!(post.form_value("settings-radarr-port"), Some("7878"));
        assert_eq!(post.form_value("settings-general-use_radarr"), Some("true"));
        assert_eq!(post.form_value("settings-auth-type"), Some("form"));
        assert_eq!(post.form_value("settings-auth-password"), Some("p"));
    }

    #[tokio::test]
    async fn test_integrations_without_credentials_disable_auth() {
        let transport = Arc::new(MockTransport::new());
        transport.on(Method::Get, "/api/system/settings", |_| ApiResponse::ok_json(&json!({})));
        transport.on(Method::Post, "/api/system/settings", |_| ApiResponse::new(204, ""));
        client(transport.clone())
            .ensure_arr_integrations(&conn("sonarr", 8989, "sk"), &conn("radarr", 7878, "rk"), None)
            .await
            .unwrap();
        let post = &transport.mutating_requests()[0];
        assert_eq!(post.form_value("settings-auth-type"), Some("none"));
        assert_eq!(post.form_value("settings-auth-password"), None);
    }

    #[tokio::test]
    async fn test_integrations_already_applied() {
        let transport = Arc::new(MockTransport::new());
        transport.on(Method::Get, "/api/system/settings", |_| {
            ApiResponse::ok_json(&json!({
                "general": { "use_sonarr": true, "use_radarr": true },
                "sonarr": { "ip": "sonarr", "port": 8989, "ssl": false, "base_url": "/", "apikey": "sk" },
                "radarr": { "ip": "radarr", "port": 7878, "ssl": false, "base_url": "/", "apikey": "rk" },
                "auth": { "type": "none" }
            }))
        });
        let changed = client(transport.clone())
            .ensure_arr_integrations(&conn("sonarr", 8989, "sk"), &conn("radarr", 7878, "rk"), None)
            .await
            .unwrap();
        assert!(!changed);
        assert!(transport.mutating_requests().is_empty());
    }
}
