use std::path::PathBuf;
use std::sync::Arc;

use crate::command::CommandRunner;
use crate::config::BootstrapConfig;
use crate::retry::RetryPolicy;
use crate::runtime::{EnvironmentData, RuntimeContext};
use crate::services::HttpTransport;

pub const DEFAULT_MEDIA_DIR: &str = "/mnt/media";

/// Everything a stage handler may read. Mutable facts live in
/// [`IntegrationState`](super::IntegrationState) instead.
#[derive(Clone)]
pub struct IntegrationContext {
    pub root_dir: PathBuf,
    pub runtime: RuntimeContext,
    pub transport: Arc<dyn HttpTransport>,
    pub runner: Arc<dyn CommandRunner>,
    pub retry: RetryPolicy,
    /// Docker CLI used for `exec`/`cp`.
    pub docker: String,
}

impl IntegrationContext {
    pub fn new(
        root_dir: impl Into<PathBuf>,
        runtime: RuntimeContext,
        transport: Arc<dyn HttpTransport>,
        runner: Arc<dyn CommandRunner>,
        config: &BootstrapConfig,
    ) -> Self {
        let retry = config.retry.policy(runtime.dry_run());
        Self {
            root_dir: root_dir.into(),
            runtime,
            transport,
            runner,
            retry,
            docker: config.compose.program.clone(),
        }
    }

    pub fn env(&self) -> &EnvironmentData {
        &self.runtime.env
    }

    pub fn dry_run(&self) -> bool {
        self.runtime.dry_run()
    }

    pub fn credentials(&self) -> Option<(&str, &str)> {
        self.runtime.credentials.pair()
    }

    /// Host-side URL for a published port.
    pub fn local_url(&self, port_env: &str, default_port: u16) -> String {
        format!("http://127.0.0.1:{}", self.env().port(port_env, default_port))
    }

    /// qBittorrent shares gluetun's network namespace when the VPN is on.
    pub fn qbit_host(&self) -> &'static str {
        if self.env().use_vpn() {
            "gluetun"
        } else {
            "qbittorrent"
        }
    }

    pub fn qbit_port(&self) -> u16 {
        self.env().port("QBIT_WEBUI", 8080)
    }

    pub fn media_dir(&self) -> String {
        self.env()
            .get_or("MEDIA_DIR", DEFAULT_MEDIA_DIR)
            .trim_end_matches('/')
            .to_string()
    }
}
