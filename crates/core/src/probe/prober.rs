use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::health::HealthCheck;
use super::types::{ProbeResult, ProbeStatus, ReadinessReport, ServiceProbe};
use crate::config::ReadinessConfig;
use crate::progress::{ProgressTracker, StepStatus};
use crate::runtime::EnvironmentData;

/// Polls service endpoints until each one answers or the round ceiling is hit.
///
/// Every probe runs in its own task and finishes independently: a ready
/// service stops being polled while slower ones keep waiting.
#[derive(Clone)]
pub struct ReadinessProber {
    checker: Arc<dyn HealthCheck>,
    max_rounds: u32,
    interval: Duration,
}

fn is_ready(status: u16) -> bool {
    (200..400).contains(&status)
}

impl ReadinessProber {
    pub fn new(checker: Arc<dyn HealthCheck>, max_rounds: u32, interval: Duration) -> Self {
        Self {
            checker,
            max_rounds: max_rounds.max(1),
            interval,
        }
    }

    pub fn from_config(checker: Arc<dyn HealthCheck>, config: &ReadinessConfig) -> Self {
        Self::new(checker, config.max_rounds, config.interval())
    }

    /// Upper bound on how long [`wait_for`](Self::wait_for) polls.
    pub fn ceiling(&self) -> Duration {
        self.interval * self.max_rounds
    }

    /// A single request against `probe`, without waiting.
    pub async fn check_once(&self, probe: &ServiceProbe, env: &EnvironmentData) -> ProbeResult {
        let (status, detail) = match probe.resolve_port(env) {
            Err(detail) => (ProbeStatus::Error, detail),
            Ok(port) => {
                let url = probe.url(port);
                match self.checker.check(&url).await {
                    Ok(code) if is_ready(code) => (ProbeStatus::Ready, format!("Reachable at {}", url)),
                    Ok(code) => (ProbeStatus::Error, format!("HTTP {} from {}", code, url)),
                    Err(e) => (ProbeStatus::Error, e),
                }
            }
        };
        ProbeResult {
            name: probe.name.clone(),
            status,
            detail,
            attempts: 1,
        }
    }

    /// Wait for every probe to become ready or run out of rounds.
    ///
    /// When `tracker` is given, each probe mirrors its state into the step
    /// keyed by the probe name.
    pub async fn wait_for(
        &self,
        probes: &[ServiceProbe],
        env: &EnvironmentData,
        tracker: Option<&ProgressTracker>,
    ) -> ReadinessReport {
        let started = Instant::now();
        let mut tasks = JoinSet::new();

        for (slot, probe) in probes.iter().enumerate() {
            let probe = probe.clone();
            let port = probe.resolve_port(env);
            let checker = Arc::clone(&self.checker);
            let tracker = tracker.cloned();
            let max_rounds = self.max_rounds;
            let interval = self.interval;
            tasks.spawn(async move {
                let result =
                    poll_probe(&probe, port, checker.as_ref(), max_rounds, interval, tracker.as_ref())
                        .await;
                (slot, result)
            });
        }

        let mut results: Vec<Option<ProbeResult>> = vec![None; probes.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((slot, result)) => results[slot] = Some(result),
                Err(e) => warn!("Readiness task failed: {}", e),
            }
        }

        let results = results
            .into_iter()
            .zip(probes)
            .map(|(result, probe)| {
                result.unwrap_or_else(|| ProbeResult {
                    name: probe.name.clone(),
                    status: ProbeStatus::Error,
                    detail: "Probe task aborted".to_string(),
                    attempts: 0,
                })
            })
            .collect();

        let report = ReadinessReport {
            results,
            elapsed: started.elapsed(),
        };
        if report.all_ready() {
            info!("All services ready after {:?}", report.elapsed);
        } else {
            warn!(
                "Services not ready after {:?}: {}",
                report.elapsed,
                report.summary().unwrap_or_default()
            );
        }
        report
    }
}

fn mirror(tracker: Option<&ProgressTracker>, key: &str, status: Option<StepStatus>, detail: &str) {
    if let Some(tracker) = tracker {
        if let Err(e) = tracker.update(key, status, Some(detail.to_string())) {
            debug!("Progress update for {} ignored: {}", key, e);
        }
    }
}

async fn poll_probe(
    probe: &ServiceProbe,
    port: Result<u16, String>,
    checker: &dyn HealthCheck,
    max_rounds: u32,
    interval: Duration,
    tracker: Option<&ProgressTracker>,
) -> ProbeResult {
    let mut result = ProbeResult {
        name: probe.name.clone(),
        status: ProbeStatus::Waiting,
        detail: "Waiting".to_string(),
        attempts: 0,
    };

    let url = match port {
        Ok(port) => probe.url(port),
        Err(detail) => {
            // Never becomes reachable, but is still given the full window.
            result.detail = detail;
            mirror(tracker, &probe.name, Some(StepStatus::Running), &result.detail);
            tokio::time::sleep(interval * max_rounds).await;
            result.status = ProbeStatus::Error;
            mirror(tracker, &probe.name, Some(StepStatus::Failed), &result.detail);
            return result;
        }
    };

    mirror(tracker, &probe.name, Some(StepStatus::Running), "Waiting");
    for round in 1..=max_rounds {
        result.attempts = round;
        match checker.check(&url).await {
            Ok(code) if is_ready(code) => {
                result.status = ProbeStatus::Ready;
                result.detail = format!("Reachable at {}", url);
                debug!("{} ready (HTTP {})", probe.name, code);
                mirror(tracker, &probe.name, Some(StepStatus::Done), &result.detail);
                return result;
            }
            Ok(code) => result.detail = format!("Waiting (last error: HTTP {} from {})", code, url),
            Err(e) => result.detail = format!("Waiting (last error: {})", e),
        }
        mirror(tracker, &probe.name, None, &result.detail);
        if round < max_rounds {
            tokio::time::sleep(interval).await;
        }
    }

    result.status = ProbeStatus::Error;
    result.detail = format!(
        "No response after waiting ~{}s",
        (interval * max_rounds).as_secs()
    );
    mirror(tracker, &probe.name, Some(StepStatus::Failed), &result.detail);
    result
}
