use std::time::Duration;

use serde::Serialize;

use crate::runtime::EnvironmentData;

/// A service health endpoint, resolved against the environment at probe time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceProbe {
    pub name: String,
    pub port_env: String,
    pub default_port: u16,
    pub path: String,
}

impl ServiceProbe {
    pub fn new(name: &str, port_env: &str, default_port: u16, path: &str) -> Self {
        Self {
            name: name.to_string(),
            port_env: port_env.to_string(),
            default_port,
            path: path.to_string(),
        }
    }

    /// Port from the environment, else the default.
    ///
    /// Unlike [`EnvironmentData::port`] an unparseable value is reported
    /// rather than silently replaced.
    pub fn resolve_port(&self, env: &EnvironmentData) -> Result<u16, String> {
        match env.get(&self.port_env) {
            None => Ok(self.default_port),
            Some(raw) => raw
                .parse::<u16>()
                .ok()
                .filter(|p| *p > 0)
                .ok_or_else(|| format!("Invalid port '{}'", raw)),
        }
    }

    pub fn url(&self, port: u16) -> String {
        format!("http://127.0.0.1:{}{}", port, self.path)
    }
}

/// The web UIs checked after the stack starts.
pub fn default_probes() -> Vec<ServiceProbe> {
    vec![
        ServiceProbe::new("Prowlarr", "PROWLARR_PORT", 9696, "/"),
        ServiceProbe::new("Sonarr", "SONARR_PORT", 8989, "/"),
        ServiceProbe::new("Radarr", "RADARR_PORT", 7878, "/"),
        ServiceProbe::new("Bazarr", "BAZARR_PORT", 6767, "/"),
        ServiceProbe::new("qBittorrent", "QBIT_WEBUI", 8080, "/"),
    ]
}

/// Probe state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Waiting,
    Ready,
    Error,
}

impl ProbeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeStatus::Waiting => "waiting",
            ProbeStatus::Ready => "ready",
            ProbeStatus::Error => "error",
        }
    }
}

/// Final (or current) state of one probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    pub name: String,
    pub status: ProbeStatus,
    pub detail: String,
    pub attempts: u32,
}

/// Outcome of a readiness wait, one entry per probe in declared order.
#[derive(Debug, Clone)]
pub struct ReadinessReport {
    pub results: Vec<ProbeResult>,
    pub elapsed: Duration,
}

impl ReadinessReport {
    pub fn all_ready(&self) -> bool {
        self.results.iter().all(|r| r.status == ProbeStatus::Ready)
    }

    pub fn failures(&self) -> Vec<&ProbeResult> {
        self.results
            .iter()
            .filter(|r| r.status != ProbeStatus::Ready)
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&ProbeResult> {
        self.results.iter().find(|r| r.name == name)
    }

    /// One line naming each non-ready probe, or `None` when all are ready.
    pub fn summary(&self) -> Option<String> {
        let failures = self.failures();
        if failures.is_empty() {
            return None;
        }
        Some(
            failures
                .iter()
                .map(|r| format!("{}: {}", r.name, r.detail))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}
