//! Readiness probing and the setup flow, on a paused clock.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use servarr_core::config::ReadinessConfig;
use servarr_core::probe::{default_probes, ProbeStatus, ReadinessProber};
use servarr_core::progress::NullRenderer;
use servarr_core::runtime::{EnvironmentData, RuntimeContext};
use servarr_core::testing::{MockTransport, RecordingCommandRunner, ScriptedHealthCheck};
use servarr_core::{BootstrapConfig, BootstrapError, BootstrapPlan, Bootstrapper, Collaborators};

const ROUNDS: u32 = 4;
const INTERVAL: Duration = Duration::from_secs(5);

const ALL_URLS: [&str; 5] = [
    "http://127.0.0.1:9696/",
    "http://127.0.0.1:8989/",
    "http://127.0.0.1:7878/",
    "http://127.0.0.1:6767/",
    "http://127.0.0.1:8080/",
];

fn config() -> BootstrapConfig {
    BootstrapConfig {
        readiness: ReadinessConfig {
            max_rounds: ROUNDS,
            interval_secs: INTERVAL.as_secs(),
            ..Default::default()
        },
        ..Default::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_probes_finish_independently() {
    let health = Arc::new(ScriptedHealthCheck::new());
    for url in ALL_URLS {
        health.set_status(url, 200);
    }
    // Sonarr comes up on the third round, Bazarr answers 503 throughout.
    health.script(
        "http://127.0.0.1:8989/",
        vec![Err("connection refused".to_string()), Ok(502), Ok(200)],
    );
    health.set_status("http://127.0.0.1:6767/", 503);

    let prober = ReadinessProber::new(health.clone(), ROUNDS, INTERVAL);
    let started = tokio::time::Instant::now();
    let report = prober.wait_for(&default_probes(), &EnvironmentData::default(), None).await;

    assert!(started.elapsed() <= INTERVAL * ROUNDS);
    assert_eq!(report.get("Prowlarr").unwrap().attempts, 1);
    assert_eq!(report.get("Sonarr").unwrap().status, ProbeStatus::Ready);
    assert_eq!(report.get("Sonarr").unwrap().attempts, 3);
    assert_eq!(health.calls_for("http://127.0.0.1:8989/"), 3);

    let bazarr = report.get("Bazarr").unwrap();
    assert_eq!(bazarr.status, ProbeStatus::Error);
    assert_eq!(bazarr.attempts, ROUNDS);
    assert_eq!(report.summary().unwrap(), "Bazarr: No response after waiting ~20s");

    let names: Vec<&str> = report.results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Prowlarr", "Sonarr", "Radarr", "Bazarr", "qBittorrent"]);
}

#[tokio::test(start_paused = true)]
async fn test_custom_ports_are_probed() {
    let health = Arc::new(ScriptedHealthCheck::new());
    health.set_status("http://127.0.0.1:18989/", 200);
    let env = EnvironmentData::from_map([("SONARR_PORT", "18989"), ("RADARR_PORT", "abc")]);

    let prober = ReadinessProber::new(health.clone(), 2, INTERVAL);
    let report = prober.wait_for(&default_probes()[1..3], &env, None).await;

    assert_eq!(report.get("Sonarr").unwrap().status, ProbeStatus::Ready);
    let radarr = report.get("Radarr").unwrap();
    assert_eq!(radarr.status, ProbeStatus::Error);
    assert_eq!(radarr.detail, "Invalid port 'abc'");
    assert_eq!(health.calls_for("http://127.0.0.1:7878/"), 0);
}

fn runtime(media: &TempDir) -> RuntimeContext {
    RuntimeContext {
        env: EnvironmentData::from_map([
            ("MEDIA_DIR", media.path().display().to_string()),
            ("USE_VPN", "false".to_string()),
        ]),
        ..Default::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_setup_flow_reaches_ready_stack() {
    let root = TempDir::new().unwrap();
    let media = TempDir::new().unwrap();
    let runner = Arc::new(RecordingCommandRunner::new());
    let health = Arc::new(ScriptedHealthCheck::new());
    for url in ALL_URLS {
        health.script(url, vec![Err("connection refused".to_string()), Ok(200)]);
    }

    let bootstrapper = Bootstrapper::new(
        root.path(),
        runtime(&media),
        config(),
        Collaborators {
            runner: runner.clone(),
            transport: Arc::new(MockTransport::new()),
            health: health.clone(),
            renderer: Arc::new(NullRenderer),
        },
    );

    let report = bootstrapper.run(&BootstrapPlan::setup()).await.unwrap();

    assert!(media.path().join("downloads").join("incomplete").is_dir());
    assert!(root.path().join("config").join("prowlarr").is_dir());
    assert_eq!(runner.calls().len(), 6);
    assert_eq!(runner.calls()[5].env_value("COMPOSE_PROFILES"), Some("no-vpn"));
    assert!(report.readiness.unwrap().all_ready());
    assert_eq!(health.total_calls(), 10);
    assert!(report.integrations.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_setup_flow_fails_when_service_never_answers() {
    let root = TempDir::new().unwrap();
    let media = TempDir::new().unwrap();
    let health = Arc::new(ScriptedHealthCheck::new());
    for url in &ALL_URLS[..4] {
        health.set_status(url, 200);
    }

    let bootstrapper = Bootstrapper::new(
        root.path(),
        runtime(&media),
        config(),
        Collaborators {
            runner: Arc::new(RecordingCommandRunner::new()),
            transport: Arc::new(MockTransport::new()),
            health,
            renderer: Arc::new(NullRenderer),
        },
    );

    let err = bootstrapper.run(&BootstrapPlan::full()).await.unwrap_err();
    match &err {
        BootstrapError::NotReady { summary } => {
            assert!(summary.starts_with("qBittorrent: "), "{summary}");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().starts_with("Service readiness failed: "));
}
