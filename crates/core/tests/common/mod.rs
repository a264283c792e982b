//! A stateful fake of the whole stack's HTTP surface.
//!
//! Each service keeps just enough state for the `ensure_*` operations to
//! observe their own writes, which is what idempotence tests need.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::{json, Map, Value};

use servarr_core::services::{ApiRequest, ApiResponse, Method, RequestBody};
use servarr_core::testing::MockTransport;

pub const USERNAME: &str = "servarr";
pub const PASSWORD: &str = "s3cret pass";
pub const FORWARDED_PORT: u16 = 51413;

pub const SONARR: u16 = 8989;
pub const RADARR: u16 = 7878;
pub const PROWLARR: u16 = 9696;

#[derive(Debug, Default)]
pub struct ArrState {
    pub download_clients: Vec<Value>,
    pub root_folders: Vec<Value>,
    pub host: Value,
    pub applications: Vec<Value>,
    pub proxies: Vec<Value>,
}

#[derive(Debug)]
pub struct StackState {
    pub qbit_prefs: Map<String, Value>,
    pub qbit_categories: Map<String, Value>,
    pub arr: HashMap<u16, ArrState>,
    pub indexers: Vec<Value>,
    pub bazarr_settings: Value,
    pub bazarr_profiles: Vec<Value>,
    pub bazarr_languages: Vec<Value>,
    next_id: i64,
}

impl StackState {
    fn fresh() -> Self {
        let mut qbit_prefs = Map::new();
        qbit_prefs.insert("web_ui_username".to_string(), json!("admin"));
        qbit_prefs.insert("web_ui_password".to_string(), json!("adminadmin"));
        qbit_prefs.insert("save_path".to_string(), json!("/downloads"));
        qbit_prefs.insert("temp_path_enabled".to_string(), json!(false));
        qbit_prefs.insert("listen_port".to_string(), json!(6881));

        let arr = [SONARR, RADARR, PROWLARR]
            .into_iter()
            .map(|port| {
                (
                    port,
                    ArrState {
                        host: json!({
                            "bindAddress": "*",
                            "port": port,
                            "authenticationMethod": "none",
                            "authenticationRequired": "enabled",
                            "username": "",
                        }),
                        ..Default::default()
                    },
                )
            })
            .collect();

        Self {
            qbit_prefs,
            qbit_categories: Map::new(),
            arr,
            indexers: vec![
                json!({ "id": 1, "name": "1337x", "enable": true }),
                json!({ "id": 2, "name": "Disabled", "enable": false }),
                json!({ "id": 7, "name": "YTS", "enable": true }),
            ],
            bazarr_settings: json!({
                "general": { "use_sonarr": false, "use_radarr": false },
                "sonarr": { "ip": "127.0.0.1", "port": 8989, "base_url": "/", "ssl": false, "apikey": "" },
                "radarr": { "ip": "127.0.0.1", "port": 7878, "base_url": "/", "ssl": false, "apikey": "" },
                "auth": { "type": null, "username": "", "apikey": "bazarr-key" },
            }),
            bazarr_profiles: Vec::new(),
            bazarr_languages: vec![
                json!({ "code2": "en", "name": "English", "enabled": false }),
                json!({ "code2": "fr", "name": "French", "enabled": true }),
            ],
            next_id: 1,
        }
    }

    fn next_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn arr(&self, port: u16) -> &ArrState {
        &self.arr[&port]
    }

    fn arr_mut(&mut self, port: u16) -> &mut ArrState {
        self.arr.entry(port).or_default()
    }
}

pub type Shared = Arc<Mutex<StackState>>;

pub fn port_of(req: &ApiRequest) -> u16 {
    req.url
        .split("://")
        .nth(1)
        .and_then(|rest| rest.split('/').next())
        .and_then(|host| host.rsplit(':').next())
        .and_then(|port| port.parse().ok())
        .unwrap_or(80)
}

fn form(req: &ApiRequest) -> Vec<(String, String)> {
    match &req.body {
        RequestBody::Form(fields) => fields.clone(),
        _ => Vec::new(),
    }
}

fn body(req: &ApiRequest) -> Value {
    req.json_body().cloned().unwrap_or(Value::Null)
}

fn trailing_id(req: &ApiRequest) -> Option<i64> {
    req.path().rsplit('/').next().and_then(|s| s.parse().ok())
}

fn route<F>(transport: &MockTransport, state: &Shared, method: Method, path: &str, handler: F)
where
    F: Fn(&mut StackState, &ApiRequest) -> ApiResponse + Send + Sync + 'static,
{
    let state = state.clone();
    transport.on(method, path, move |req| handler(&mut state.lock().unwrap(), req));
}

fn upsert(items: &mut Vec<Value>, mut item: Value, id: i64) {
    item["id"] = json!(id);
    match items.iter_mut().find(|i| i.get("id").and_then(Value::as_i64) == Some(id)) {
        Some(existing) => *existing = item,
        None => items.push(item),
    }
}

fn schema(implementation: &str, fields: Value) -> Value {
    json!({ "implementation": implementation, "implementationName": implementation, "fields": fields })
}

/// Register every route of the fake stack on `transport`.
pub fn install(transport: &MockTransport) -> Shared {
    let state: Shared = Arc::new(Mutex::new(StackState::fresh()));
    install_qbittorrent(transport, &state);
    install_arr(transport, &state);
    install_prowlarr(transport, &state);
    install_bazarr(transport, &state);
    route(transport, &state, Method::Get, "/v1/openvpn/portforwarded", |_, _| {
        ApiResponse::ok_json(&json!({ "port": FORWARDED_PORT }))
    });
    state
}

fn install_qbittorrent(transport: &MockTransport, state: &Shared) {
    route(transport, state, Method::Post, "/api/v2/auth/login", |s, req| {
        let accepted = req.form_value("username") == s.qbit_prefs["web_ui_username"].as_str()
            && req.form_value("password") == s.qbit_prefs["web_ui_password"].as_str();
        ApiResponse::new(200, if accepted { "Ok." } else { "Fails." })
    });
    route(transport, state, Method::Get, "/api/v2/app/preferences", |s, _| {
        ApiResponse::ok_json(&Value::Object(s.qbit_prefs.clone()))
    });
    route(transport, state, Method::Post, "/api/v2/app/setPreferences", |s, req| {
        let update: Map<String, Value> = req
            .form_value("json")
            .and_then(|json| serde_json::from_str(json).ok())
            .unwrap_or_default();
        s.qbit_prefs.extend(update);
        ApiResponse::new(200, "")
    });
    route(transport, state, Method::Get, "/api/v2/torrents/categories", |s, _| {
        ApiResponse::ok_json(&Value::Object(s.qbit_categories.clone()))
    });
    for path in ["/api/v2/torrents/createCategory", "/api/v2/torrents/editCategory"] {
        route(transport, state, Method::Post, path, |s, req| {
            let name = req.form_value("category").unwrap_or_default().to_string();
            let save_path = req.form_value("savePath").unwrap_or_default();
            s.qbit_categories
                .insert(name.clone(), json!({ "name": name, "savePath": save_path }));
            ApiResponse::new(200, "")
        });
    }
}

fn install_arr(transport: &MockTransport, state: &Shared) {
    route(transport, state, Method::Get, "/api/v3/downloadclient", |s, req| {
        ApiResponse::ok_json(&Value::Array(s.arr(port_of(req)).download_clients.clone()))
    });
    route(transport, state, Method::Get, "/api/v3/downloadclient/schema", |_, _| {
        ApiResponse::ok_json(&json!([
            schema("Transmission", json!([])),
            schema(
                "QBittorrent",
                json!([
                    { "name": "host", "value": "localhost" },
                    { "name": "port", "value": 8080 },
                    { "name": "username", "value": "" },
                    { "name": "password", "value": "" },
                    { "name": "category", "value": "tv-sonarr" },
                ])
            ),
        ]))
    });
    route(transport, state, Method::Post, "/api/v3/downloadclient", |s, req| {
        let id = s.next_id();
        upsert(&mut s.arr_mut(port_of(req)).download_clients, body(req), id);
        ApiResponse::new(201, "{}")
    });
    route(transport, state, Method::Put, "/api/v3/downloadclient/*", |s, req| {
        let id = trailing_id(req).unwrap_or_default();
        upsert(&mut s.arr_mut(port_of(req)).download_clients, body(req), id);
        ApiResponse::new(202, "{}")
    });
    route(transport, state, Method::Get, "/api/v3/rootfolder", |s, req| {
        ApiResponse::ok_json(&Value::Array(s.arr(port_of(req)).root_folders.clone()))
    });
    route(transport, state, Method::Post, "/api/v3/rootfolder", |s, req| {
        let id = s.next_id();
        upsert(&mut s.arr_mut(port_of(req)).root_folders, body(req), id);
        ApiResponse::new(201, "{}")
    });
    for prefix in ["/api/v3", "/api/v1"] {
        route(transport, state, Method::Get, &format!("{}/config/host", prefix), |s, req| {
            ApiResponse::ok_json(&s.arr(port_of(req)).host)
        });
        route(transport, state, Method::Put, &format!("{}/config/host", prefix), |s, req| {
            s.arr_mut(port_of(req)).host = body(req);
            ApiResponse::new(202, "{}")
        });
    }
}

fn install_prowlarr(transport: &MockTransport, state: &Shared) {
    let app_fields = |base: &str| {
        json!([
            { "name": "prowlarrUrl", "value": "http://localhost:9696" },
            { "name": "baseUrl", "value": base },
            { "name": "apiKey", "value": "" },
            { "name": "syncCategories", "value": [5000, 5040] },
        ])
    };
    let app_schemas = json!([
        schema("Sonarr", app_fields("http://localhost:8989")),
        schema("Radarr", app_fields("http://localhost:7878")),
    ]);

    route(transport, state, Method::Get, "/api/v1/applications", |s, _| {
        ApiResponse::ok_json(&Value::Array(s.arr(PROWLARR).applications.clone()))
    });
    route(transport, state, Method::Get, "/api/v1/applications/schema", move |_, _| {
        ApiResponse::ok_json(&app_schemas)
    });
    route(transport, state, Method::Post, "/api/v1/applications", |s, req| {
        let id = s.next_id();
        upsert(&mut s.arr_mut(PROWLARR).applications, body(req), id);
        ApiResponse::new(201, "{}")
    });
    route(transport, state, Method::Put, "/api/v1/applications/*", |s, req| {
        let id = trailing_id(req).unwrap_or_default();
        upsert(&mut s.arr_mut(PROWLARR).applications, body(req), id);
        ApiResponse::new(202, "{}")
    });
    route(transport, state, Method::Get, "/api/v1/indexerProxy", |s, _| {
        ApiResponse::ok_json(&Value::Array(s.arr(PROWLARR).proxies.clone()))
    });
    route(transport, state, Method::Get, "/api/v1/indexerProxy/schema", |_, _| {
        ApiResponse::ok_json(&json!([schema(
            "FlareSolverr",
            json!([{ "name": "host", "value": "http://localhost:8191/" }, { "name": "requestTimeout", "value": 60 }])
        )]))
    });
    route(transport, state, Method::Post, "/api/v1/indexerProxy", |s, req| {
        let id = s.next_id();
        upsert(&mut s.arr_mut(PROWLARR).proxies, body(req), id);
        ApiResponse::new(201, "{}")
    });
    route(transport, state, Method::Get, "/api/v1/indexer", |s, _| {
        ApiResponse::ok_json(&Value::Array(s.indexers.clone()))
    });
}

fn install_bazarr(transport: &MockTransport, state: &Shared) {
    route(transport, state, Method::Get, "/api/system/settings", |s, _| {
        ApiResponse::ok_json(&s.bazarr_settings)
    });
    route(transport, state, Method::Get, "/api/system/languages", |s, _| {
        ApiResponse::ok_json(&Value::Array(s.bazarr_languages.clone()))
    });
    route(transport, state, Method::Get, "/api/system/languages/profiles", |s, _| {
        ApiResponse::ok_json(&Value::Array(s.bazarr_profiles.clone()))
    });
    route(transport, state, Method::Post, "/api/system/settings", |s, req| {
        let fields = form(req);
        let enabled: Vec<&str> = fields
            .iter()
            .filter(|(k, _)| k == "languages-enabled")
            .map(|(_, v)| v.as_str())
            .collect();
        if !enabled.is_empty() {
            for language in s.bazarr_languages.iter_mut() {
                let code = language["code2"].as_str().unwrap_or_default().to_string();
                language["enabled"] = json!(enabled.contains(&code.as_str()));
            }
        }
        for (key, value) in &fields {
            if key == "languages-profiles" {
                s.bazarr_profiles = serde_json::from_str(value).unwrap_or_default();
                continue;
            }
            let mut parts = key.splitn(3, '-');
            if let (Some("settings"), Some(section), Some(name)) = (parts.next(), parts.next(), parts.next()) {
                s.bazarr_settings[section][name] = json!(value);
            }
        }
        ApiResponse::new(204, "")
    });
}

/// Requests that changed something, excluding qBittorrent logins.
pub fn writes(requests: &[ApiRequest]) -> Vec<String> {
    requests
        .iter()
        .filter(|r| r.is_mutation() && r.path() != "/api/v2/auth/login")
        .map(|r| format!("{} :{}{}", r.method, port_of(r), r.path()))
        .collect()
}
