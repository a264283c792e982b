//! The seven integration stages.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

use super::context::IntegrationContext;
use super::runner::StageHandler;
use super::state::IntegrationState;
use super::types::{IntegrationError, StageOutcome};
use crate::services::{
    read_arr_api_key, read_bazarr_api_key, read_prowlarr_api_key, ArrClient, ArrConnection, BazarrClient,
    CrossSeedConfigurator, CrossSeedTargets, DownloadClientSettings, GluetunClient, ProwlarrClient,
    QbittorrentClient, RecyclarrManager, ServiceId,
};

/// A content manager wired to qBittorrent, Prowlarr and Bazarr.
#[derive(Debug, Clone, Copy)]
pub struct ArrTarget {
    pub service: ServiceId,
    pub port_env: &'static str,
    pub default_port: u16,
    pub category_env: &'static str,
    pub default_category: &'static str,
    pub media_subdir: &'static str,
}

impl ArrTarget {
    pub fn port(&self, ctx: &IntegrationContext) -> u16 {
        ctx.env().port(self.port_env, self.default_port)
    }

    pub fn category<'a>(&self, ctx: &'a IntegrationContext) -> &'a str {
        ctx.env().get_or(self.category_env, self.default_category)
    }

    /// URL other containers use to reach this service.
    pub fn internal_url(&self, ctx: &IntegrationContext) -> String {
        format!("http://{}:{}", self.service.as_str(), self.port(ctx))
    }

    fn client(&self, ctx: &IntegrationContext, api_key: &str) -> ArrClient {
        ArrClient::new(
            self.service.display_name(),
            &ctx.local_url(self.port_env, self.default_port),
            api_key,
            ctx.transport.clone(),
            ctx.retry,
            ctx.dry_run(),
        )
    }
}

pub const ARR_TARGETS: [ArrTarget; 2] = [
    ArrTarget {
        service: ServiceId::Sonarr,
        port_env: "SONARR_PORT",
        default_port: 8989,
        category_env: "SONARR_QBIT_CATEGORY",
        default_category: "sonarr-tv",
        media_subdir: "tv",
    },
    ArrTarget {
        service: ServiceId::Radarr,
        port_env: "RADARR_PORT",
        default_port: 7878,
        category_env: "RADARR_QBIT_CATEGORY",
        default_category: "radarr-movies",
        media_subdir: "movies",
    },
];

fn prowlarr_client(ctx: &IntegrationContext, api_key: &str) -> ProwlarrClient {
    ProwlarrClient::new(
        &ctx.local_url("PROWLARR_PORT", 9696),
        api_key,
        ctx.transport.clone(),
        ctx.retry,
        ctx.dry_run(),
    )
}

/// qBittorrent credentials, auth bypass, storage layout and VPN port.
pub struct QbittorrentStage;

impl QbittorrentStage {
    /// Copy gluetun's forwarded port into qBittorrent. Failures only warn:
    /// not every VPN provider supports port forwarding.
    async fn sync_forwarded_port(ctx: &IntegrationContext, qbit: &QbittorrentClient) -> Option<String> {
        if ctx.dry_run() {
            return None;
        }
        let gluetun = GluetunClient::new(
            &ctx.local_url("GLUETUN_CONTROL_PORT", 8000),
            ctx.transport.clone(),
            ctx.retry,
        );
        match gluetun.forwarded_port().await {
            Ok(Some(port)) => match qbit.set_listen_port(port).await {
                Ok(_) => Some(format!("listen port {}", port)),
                Err(e) => {
                    warn!("qBittorrent: could not apply forwarded port {}: {}", port, e);
                    Some("forwarded port not applied".to_string())
                }
            },
            Ok(None) => {
                info!("Gluetun has no forwarded port yet");
                None
            }
            Err(e) => {
                warn!("Gluetun forwarded port unavailable: {}", e);
                Some("forwarded port unavailable".to_string())
            }
        }
    }
}

#[async_trait]
impl StageHandler for QbittorrentStage {
    fn key(&self) -> &str {
        "qbittorrent"
    }

    fn label(&self) -> &str {
        "qBittorrent"
    }

    async fn run(
        &self,
        ctx: &IntegrationContext,
        _state: &mut IntegrationState,
    ) -> Result<StageOutcome, IntegrationError> {
        let Some((username, password)) = ctx.credentials() else {
            return Ok(StageOutcome::skipped("No shared credentials provided"));
        };

        let qbit = QbittorrentClient::new(
            &ctx.local_url("QBIT_WEBUI", 8080),
            ctx.transport.clone(),
            ctx.retry,
            ctx.dry_run(),
        );
        qbit.ensure_credentials(username, password, ctx.env().get("LAN_SUBNET"))
            .await
            .map_err(IntegrationError::service("qBittorrent"))?;

        let categories: Vec<&str> = ARR_TARGETS.iter().map(|t| t.category(ctx)).collect();
        let downloads = format!("{}/downloads", ctx.media_dir());
        qbit.ensure_storage_layout(&downloads, &categories)
            .await
            .map_err(IntegrationError::service("qBittorrent"))?;

        let mut detail = "Credentials, auth bypass and storage layout configured".to_string();
        if ctx.env().use_vpn() {
            if let Some(note) = Self::sync_forwarded_port(ctx, &qbit).await {
                detail.push_str(&format!("; {}", note));
            }
        }
        Ok(StageOutcome::done(detail))
    }
}

/// Sonarr/Radarr: API keys, qBittorrent download client, root folder.
pub struct ArrClientsStage;

#[async_trait]
impl StageHandler for ArrClientsStage {
    fn key(&self) -> &str {
        "arr_clients"
    }

    fn label(&self) -> &str {
        "Sonarr/Radarr download clients"
    }

    async fn run(
        &self,
        ctx: &IntegrationContext,
        state: &mut IntegrationState,
    ) -> Result<StageOutcome, IntegrationError> {
        let (username, password) = ctx.credentials().unwrap_or(("", ""));

        for target in &ARR_TARGETS {
            let api_key = read_arr_api_key(&ctx.root_dir, target.service)?;
            state.record_api_key(target.service, api_key.clone());

            let name = target.service.display_name();
            let client = target.client(ctx, &api_key);
            let settings = DownloadClientSettings {
                host: ctx.qbit_host().to_string(),
                port: ctx.qbit_port(),
                username: username.to_string(),
                password: password.to_string(),
                category: target.category(ctx).to_string(),
            };
            client
                .ensure_qbittorrent_download_client(&settings)
                .await
                .map_err(IntegrationError::service(name))?;
            client
                .ensure_root_folder(&format!("{}/{}", ctx.media_dir(), target.media_subdir))
                .await
                .map_err(IntegrationError::service(name))?;
        }

        Ok(StageOutcome::done("Download clients and root folders updated"))
    }
}

/// Prowlarr: application links to both managers and the FlareSolverr proxy.
pub struct ProwlarrStage;

#[async_trait]
impl StageHandler for ProwlarrStage {
    fn key(&self) -> &str {
        "prowlarr"
    }

    fn label(&self) -> &str {
        "Prowlarr applications"
    }

    async fn run(
        &self,
        ctx: &IntegrationContext,
        state: &mut IntegrationState,
    ) -> Result<StageOutcome, IntegrationError> {
        let prowlarr_key = read_prowlarr_api_key(&ctx.root_dir)?;
        state.record_api_key(ServiceId::Prowlarr, prowlarr_key.clone());
        let client = prowlarr_client(ctx, &prowlarr_key);
        let prowlarr_internal = format!("http://prowlarr:{}", ctx.env().port("PROWLARR_PORT", 9696));

        for target in &ARR_TARGETS {
            let api_key = state.api_key(target.service)?;
            let fields = [
                ("prowlarrUrl", json!(prowlarr_internal)),
                ("baseUrl", json!(target.internal_url(ctx))),
                ("apiKey", json!(api_key)),
            ];
            client
                .ensure_application(target.service.display_name(), &fields)
                .await
                .map_err(IntegrationError::service("Prowlarr"))?;
        }

        let flaresolverr = match ctx.env().get("FLARESOLVERR_URL") {
            Some(url) => url.to_string(),
            None => format!("http://flaresolverr:{}/", ctx.env().port("FLARESOLVERR_PORT", 8191)),
        };
        let mut detail = "Sonarr and Radarr applications linked".to_string();
        if let Err(e) = client.ensure_flaresolverr_proxy(&flaresolverr).await {
            warn!("Prowlarr proxy configuration skipped: {}", e);
            detail.push_str("; FlareSolverr proxy skipped");
        }

        state.set_prowlarr(Arc::new(client));
        Ok(StageOutcome::done(detail))
    }
}

/// Bazarr: manager connections and English subtitle defaults.
pub struct BazarrStage;

#[async_trait]
impl StageHandler for BazarrStage {
    fn key(&self) -> &str {
        "bazarr"
    }

    fn label(&self) -> &str {
        "Bazarr integrations"
    }

    async fn run(
        &self,
        ctx: &IntegrationContext,
        state: &mut IntegrationState,
    ) -> Result<StageOutcome, IntegrationError> {
        let bazarr_key = read_bazarr_api_key(&ctx.root_dir)?;
        state.record_api_key(ServiceId::Bazarr, bazarr_key.clone());

        let connection = |target: &ArrTarget| -> Result<ArrConnection, IntegrationError> {
            let base_env = format!("{}_BASE_URL", target.service.as_str().to_ascii_uppercase());
            Ok(ArrConnection {
                host: target.service.as_str().to_string(),
                port: target.port(ctx),
                api_key: state.api_key(target.service)?.to_string(),
                base_url: ctx.env().get_or(&base_env, "").to_string(),
                use_ssl: false,
            })
        };
        let sonarr = connection(&ARR_TARGETS[0])?;
        let radarr = connection(&ARR_TARGETS[1])?;

        let client = BazarrClient::new(
            &ctx.local_url("BAZARR_PORT", 6767),
            &bazarr_key,
            ctx.transport.clone(),
            ctx.retry,
            ctx.dry_run(),
        );
        client
            .ensure_arr_integrations(&sonarr, &radarr, ctx.credentials())
            .await
            .map_err(IntegrationError::service("Bazarr"))?;
        client
            .ensure_language_preferences()
            .await
            .map_err(IntegrationError::service("Bazarr"))?;

        Ok(StageOutcome::done("Sonarr/Radarr linked; English subtitles by default"))
    }
}

/// Recyclarr: config file plus a sync run.
pub struct RecyclarrStage;

#[async_trait]
impl StageHandler for RecyclarrStage {
    fn key(&self) -> &str {
        "recyclarr"
    }

    fn label(&self) -> &str {
        "Recyclarr sync"
    }

    async fn run(
        &self,
        ctx: &IntegrationContext,
        state: &mut IntegrationState,
    ) -> Result<StageOutcome, IntegrationError> {
        let sonarr_key = state.api_key(ServiceId::Sonarr)?;
        let radarr_key = state.api_key(ServiceId::Radarr)?;

        let manager = RecyclarrManager::new(&ctx.root_dir, ctx.runner.clone(), &ctx.docker, ctx.dry_run());
        let changed = manager
            .ensure_config(sonarr_key, radarr_key)
            .map_err(IntegrationError::service("Recyclarr"))?;
        manager.run_sync().await.map_err(IntegrationError::service("Recyclarr"))?;

        Ok(StageOutcome::done(if changed {
            "recyclarr.yml updated; sync completed"
        } else {
            "Sync completed"
        }))
    }
}

/// Cross-Seed: torznab feeds, manager URLs, torrent client and link dir.
pub struct CrossSeedStage;

#[async_trait]
impl StageHandler for CrossSeedStage {
    fn key(&self) -> &str {
        "cross_seed"
    }

    fn label(&self) -> &str {
        "Cross-Seed config"
    }

    async fn run(
        &self,
        ctx: &IntegrationContext,
        state: &mut IntegrationState,
    ) -> Result<StageOutcome, IntegrationError> {
        let torznab = match state.prowlarr() {
            Some(prowlarr) => prowlarr
                .list_indexers()
                .await
                .map_err(IntegrationError::service("Prowlarr"))?
                .into_iter()
                .filter(|idx| idx.enable)
                .map(|idx| format!("http://prowlarr:9696/{}/api?apikey={}", idx.id, prowlarr.api_key()))
                .collect(),
            None => Vec::new(),
        };

        let torrent_clients = match ctx.credentials() {
            Some((username, password)) => vec![format!(
                "qbittorrent:http://{}:{}@{}:{}",
                urlencoding::encode(username),
                urlencoding::encode(password),
                ctx.qbit_host(),
                ctx.qbit_port()
            )],
            None => {
                warn!("Cross-Seed: Skipping torrent client config (no credentials)");
                Vec::new()
            }
        };

        let targets = CrossSeedTargets {
            torznab,
            sonarr: vec![format!("http://sonarr:8989?apikey={}", state.api_key(ServiceId::Sonarr)?)],
            radarr: vec![format!("http://radarr:7878?apikey={}", state.api_key(ServiceId::Radarr)?)],
            torrent_clients,
            link_dirs: vec![format!("{}/downloads/cross-seeds", ctx.media_dir())],
        };
        let indexers = targets.torznab.len();

        let configurator = CrossSeedConfigurator::new(&ctx.root_dir, ctx.runner.clone(), &ctx.docker, ctx.dry_run());
        let changed = configurator
            .ensure_config(&targets)
            .await
            .map_err(IntegrationError::service("Cross-Seed"))?;

        Ok(StageOutcome::done(format!(
            "{} ({} torznab feeds)",
            if changed { "config.js updated" } else { "config.js up to date" },
            indexers
        )))
    }
}

/// Shared UI login for Sonarr, Radarr and Prowlarr.
pub struct ServiceAuthStage;

#[async_trait]
impl StageHandler for ServiceAuthStage {
    fn key(&self) -> &str {
        "service_auth"
    }

    fn label(&self) -> &str {
        "Service UI credentials"
    }

    async fn run(
        &self,
        ctx: &IntegrationContext,
        state: &mut IntegrationState,
    ) -> Result<StageOutcome, IntegrationError> {
        let Some((username, password)) = ctx.credentials() else {
            return Ok(StageOutcome::skipped("No shared credentials provided"));
        };

        let mut configured = Vec::new();
        for target in &ARR_TARGETS {
            let name = target.service.display_name();
            let client = target.client(ctx, state.api_key(target.service)?);
            client
                .ensure_ui_credentials(username, password)
                .await
                .map_err(IntegrationError::service(name))?;
            configured.push(name);
        }
        if let Some(prowlarr) = state.prowlarr() {
            prowlarr
                .ensure_ui_credentials(username, password)
                .await
                .map_err(IntegrationError::service("Prowlarr"))?;
            configured.push("Prowlarr");
        }

        Ok(StageOutcome::done(format!("Forms login enabled for {}", configured.join(", "))))
    }
}
