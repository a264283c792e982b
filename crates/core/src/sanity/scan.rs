use std::path::Path;

use futures::future::join_all;
use serde_json::Value;
use tracing::debug;

use super::types::{SanityItem, SanityReport};
use crate::command::{CommandError, CommandRunner, CommandSpec};
use crate::compose::{ComposeProfile, COMPOSE_PROFILES_ENV};
use crate::probe::{default_probes, ProbeStatus, ReadinessProber};
use crate::runtime::RuntimeContext;

pub const REQUIRED_CONFIG_DIRS: [&str; 7] = [
    "bazarr",
    "cross-seed",
    "prowlarr",
    "qbittorrent",
    "radarr",
    "recyclarr",
    "sonarr",
];

pub const REQUIRED_ENV_KEYS: [&str; 3] = ["MEDIA_DIR", "PUID", "PGID"];

/// Run every check and collect the findings. Never fails: problems become
/// WARN or ERROR items.
pub async fn run_sanity_scan(
    root_dir: &Path,
    runtime: &RuntimeContext,
    runner: &dyn CommandRunner,
    prober: &ReadinessProber,
    docker: &str,
) -> SanityReport {
    let mut items = vec![
        check_docker_cli(runner, docker).await,
        check_docker_daemon(runner, docker).await,
        check_compose_file(root_dir),
        check_compose_services(root_dir, runtime, runner, docker).await,
        check_config_directories(&root_dir.join("config")),
        check_env_settings(runtime),
    ];
    items.extend(check_service_apis(runtime, prober).await);
    SanityReport { items }
}

async fn check_docker_cli(runner: &dyn CommandRunner, docker: &str) -> SanityItem {
    match runner.run(&CommandSpec::new(docker).arg("--version")).await {
        Ok(output) => {
            let version = output.stdout.trim();
            let detail = if version.is_empty() {
                format!("Found `{}` executable", docker)
            } else {
                version.to_string()
            };
            SanityItem::ok("Docker CLI", detail)
        }
        Err(CommandError::Spawn { .. }) => SanityItem::error(
            "Docker CLI",
            format!("`{}` executable not found in PATH.", docker),
            "Install Docker and ensure the CLI is available.",
        ),
        Err(e) => SanityItem::error(
            "Docker CLI",
            e.to_string(),
            "Install Docker and ensure the CLI is available.",
        ),
    }
}

async fn check_docker_daemon(runner: &dyn CommandRunner, docker: &str) -> SanityItem {
    match runner.run(&CommandSpec::new(docker).arg("info")).await {
        Ok(_) => SanityItem::ok("Docker daemon", "Docker daemon is reachable."),
        Err(e) => SanityItem::error(
            "Docker daemon",
            "Unable to communicate with Docker daemon.",
            format!("Ensure Docker is running and accessible. ({})", e.stderr().trim()),
        ),
    }
}

fn check_compose_file(root_dir: &Path) -> SanityItem {
    let compose_file = root_dir.join("docker-compose.yml");
    if compose_file.exists() {
        SanityItem::ok(
            "docker-compose.yml",
            format!("Found compose file at {}", compose_file.display()),
        )
    } else {
        SanityItem::error(
            "docker-compose.yml",
            "Missing docker-compose.yml in repo root.",
            "Restore the compose file before running the bootstrapper.",
        )
    }
}

/// Rows from `docker compose ps --format json`. Older Compose releases print
/// one object per line, newer ones a single array.
fn parse_ps_rows(stdout: &str) -> Result<Vec<Value>, String> {
    let mut rows = Vec::new();
    for (idx, line) in stdout.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(Value::Array(items)) => rows.extend(items),
            Ok(row @ Value::Object(_)) => rows.push(row),
            Ok(_) => {}
            Err(e) => return Err(format!("line {}: {}", idx + 1, e)),
        }
    }
    Ok(rows)
}

async fn check_compose_services(
    root_dir: &Path,
    runtime: &RuntimeContext,
    runner: &dyn CommandRunner,
    docker: &str,
) -> SanityItem {
    const NAME: &str = "Compose services";
    let profile = ComposeProfile::from_env(&runtime.env);
    let compose = |args: &[&str]| {
        CommandSpec::new(docker)
            .args(["compose", "--project-directory"])
            .arg(root_dir.display().to_string())
            .args(args.iter().copied())
            .current_dir(root_dir)
            .env(COMPOSE_PROFILES_ENV, profile.as_str())
    };

    let services: Vec<String> = match runner.run(&compose(&["config", "--services"])).await {
        Ok(output) => output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect(),
        Err(e) => {
            return SanityItem::warn(
                NAME,
                "Unable to list services via `docker compose config --services`.",
                format!("Check docker compose configuration ({}).", e.stderr().trim()),
            )
        }
    };
    if services.is_empty() {
        return SanityItem::warn(
            NAME,
            "No services defined in docker compose file.",
            "Ensure docker-compose.yml declares the Servarr stack.",
        );
    }

    let rows = match runner.run(&compose(&["ps", "--format", "json"])).await {
        Ok(output) => match parse_ps_rows(&output.stdout) {
            Ok(rows) => rows,
            Err(e) => {
                return SanityItem::warn(
                    NAME,
                    format!("Failed to parse docker compose status output on {}", e),
                    "Ensure your Docker Compose version supports --format json.",
                )
            }
        },
        Err(e) => {
            return SanityItem::warn(
                NAME,
                format!("Unable to inspect container status ({}).", e.stderr().trim()),
                "Run `docker compose up -d` before continuing.",
            )
        }
    };

    let running = rows
        .iter()
        .filter(|row| row.get("State").and_then(Value::as_str) == Some("running"))
        .count();
    debug!("{} of {} compose services running", running, services.len());
    let detail = format!("{}/{} services running.", running, services.len());
    if running >= services.len() {
        SanityItem::ok(NAME, detail)
    } else {
        SanityItem::warn(
            NAME,
            detail,
            "Start the stack with `docker compose up -d` to ensure APIs are reachable.",
        )
    }
}

fn check_config_directories(config_root: &Path) -> SanityItem {
    let missing: Vec<&str> = REQUIRED_CONFIG_DIRS
        .iter()
        .copied()
        .filter(|dir| !config_root.join(dir).exists())
        .collect();
    if missing.is_empty() {
        SanityItem::ok(
            "Config directories",
            format!("All required directories exist under {}", config_root.display()),
        )
    } else {
        SanityItem::warn(
            "Config directories",
            format!("Missing directories: {}", missing.join(", ")),
            "They will be created automatically, but ensure storage paths are correct.",
        )
    }
}

fn check_env_settings(runtime: &RuntimeContext) -> SanityItem {
    let missing: Vec<&str> = REQUIRED_ENV_KEYS
        .iter()
        .copied()
        .filter(|key| runtime.env.get(key).is_none())
        .collect();
    if missing.is_empty() {
        SanityItem::ok("Environment values", "Core environment variables are set.")
    } else {
        SanityItem::warn(
            "Environment values",
            format!("Unset required env keys: {}", missing.join(", ")),
            "Populate the values in .env or export them before running non-interactively.",
        )
    }
}

async fn check_service_apis(runtime: &RuntimeContext, prober: &ReadinessProber) -> Vec<SanityItem> {
    let probes = default_probes();
    let results = join_all(probes.iter().map(|probe| prober.check_once(probe, &runtime.env))).await;
    results
        .into_iter()
        .map(|result| {
            let name = format!("{} API", result.name);
            match result.status {
                ProbeStatus::Ready => SanityItem::ok(name, result.detail),
                _ if result.detail.starts_with("Invalid port") => SanityItem::warn(
                    name,
                    result.detail,
                    "Update the port value in .env or environment variables.",
                ),
                _ => SanityItem::warn(
                    name,
                    format!("Unable to reach service: {}", result.detail),
                    "Start the container or verify port bindings.",
                ),
            }
        })
        .collect()
}
