use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::command::{CommandError, CommandRunner, CommandSpec};
use crate::config::ComposeConfig;
use crate::progress::{ProgressError, ProgressTracker, StepDefinition, StepStatus};
use crate::runtime::EnvironmentData;

pub const COMPOSE_PROFILES_ENV: &str = "COMPOSE_PROFILES";

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("Docker command failed ({command}): {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error(transparent)]
    Progress(#[from] ProgressError),
}

impl From<CommandError> for ComposeError {
    fn from(err: CommandError) -> Self {
        ComposeError::CommandFailed {
            command: err.command().to_string(),
            stderr: err.stderr().to_string(),
        }
    }
}

/// Which set of compose services to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeProfile {
    Vpn,
    NoVpn,
}

impl ComposeProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComposeProfile::Vpn => "vpn",
            ComposeProfile::NoVpn => "no-vpn",
        }
    }

    pub fn from_env(env: &EnvironmentData) -> Self {
        if env.use_vpn() {
            ComposeProfile::Vpn
        } else {
            ComposeProfile::NoVpn
        }
    }
}

impl std::fmt::Display for ComposeProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One command of the lifecycle, tracked as its own step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeStep {
    pub key: &'static str,
    pub label: String,
    /// Detail shown while the command runs.
    pub activity: String,
    pub spec: CommandSpec,
}

/// Drives `docker compose` through a [`CommandRunner`].
pub struct ComposeDriver {
    runner: Arc<dyn CommandRunner>,
    project_dir: PathBuf,
    config: ComposeConfig,
}

impl ComposeDriver {
    pub fn new(runner: Arc<dyn CommandRunner>, project_dir: impl Into<PathBuf>, config: ComposeConfig) -> Self {
        Self {
            runner,
            project_dir: project_dir.into(),
            config,
        }
    }

    fn compose(&self, args: &[&str], profile: Option<ComposeProfile>) -> CommandSpec {
        let spec = CommandSpec::new(&self.config.program)
            .arg("compose")
            .args(args.iter().copied())
            .current_dir(&self.project_dir);
        match profile {
            Some(profile) => spec.env(COMPOSE_PROFILES_ENV, profile.as_str()),
            None => spec,
        }
    }

    /// The fixed six-command sequence for `profile`.
    ///
    /// Both profiles are stopped first so switching between them never
    /// leaves the other profile's containers running.
    pub fn plan(&self, profile: ComposeProfile) -> Vec<ComposeStep> {
        let p = profile.as_str();
        vec![
            ComposeStep {
                key: "down_vpn",
                label: "Stop VPN profile".to_string(),
                activity: "Stopping VPN profile".to_string(),
                spec: self.compose(&["down"], Some(ComposeProfile::Vpn)),
            },
            ComposeStep {
                key: "down_no_vpn",
                label: "Stop no-VPN profile".to_string(),
                activity: "Stopping no-VPN profile".to_string(),
                spec: self.compose(&["down"], Some(ComposeProfile::NoVpn)),
            },
            ComposeStep {
                key: "down_orphans",
                label: "Remove orphans".to_string(),
                activity: "Removing orphan containers".to_string(),
                spec: self.compose(&["down", "--remove-orphans"], None),
            },
            ComposeStep {
                key: "build_health",
                label: "Build health service".to_string(),
                activity: "Building health service".to_string(),
                spec: self.compose(&["build", &self.config.health_service], None),
            },
            ComposeStep {
                key: "pull_profile",
                label: format!("Pull ({})", p),
                activity: format!("Pulling images for {}", p),
                spec: self.compose(&["pull"], Some(profile)),
            },
            ComposeStep {
                key: "up_profile",
                label: format!("Start ({})", p),
                activity: format!("Starting services ({})", p),
                spec: self.compose(&["up", "-d"], Some(profile)),
            },
        ]
    }

    pub fn step_definitions(&self, profile: ComposeProfile) -> Vec<StepDefinition> {
        self.plan(profile)
            .into_iter()
            .map(|step| StepDefinition::new(step.key, step.label))
            .collect()
    }

    /// Run the lifecycle, mirroring each command into `tracker`.
    ///
    /// The first failing command aborts the sequence; later steps stay
    /// pending. In dry-run no command is executed.
    pub async fn bring_up(
        &self,
        profile: ComposeProfile,
        dry_run: bool,
        tracker: &ProgressTracker,
    ) -> Result<(), ComposeError> {
        let plan = self.plan(profile);

        if dry_run {
            info!("[dry-run] Would execute compose workflow for '{}' profile", profile);
            for step in &plan {
                tracker.set(step.key, StepStatus::Skipped, format!("[dry-run] {}", step.spec.display()))?;
            }
            return Ok(());
        }

        for step in &plan {
            tracker.set(step.key, StepStatus::Running, step.activity.clone())?;
            match self.runner.run(&step.spec).await {
                Ok(_) => tracker.set(step.key, StepStatus::Done, "Completed")?,
                Err(e) => {
                    tracker.set(step.key, StepStatus::Failed, e.to_string())?;
                    return Err(e.into());
                }
            }
        }

        info!("Docker services started with {} profile", profile);
        Ok(())
    }
}
