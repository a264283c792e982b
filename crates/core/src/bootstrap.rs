//! Top-level workflow: layout, compose bring-up, readiness, integrations.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;

use crate::command::{CommandRunner, SystemCommandRunner};
use crate::compose::{ComposeDriver, ComposeError, ComposeProfile};
use crate::config::BootstrapConfig;
use crate::layout::{ensure_layout, LayoutError, LayoutReport};
use crate::pipeline::{
    IntegrationContext, IntegrationError, IntegrationState, PipelineError, PipelineSummary, StagePipeline,
};
use crate::probe::{default_probes, HealthCheck, HttpHealthCheck, ReadinessProber, ReadinessReport};
use crate::progress::{LogRenderer, ProgressError, ProgressRenderer, ProgressTracker, StepDefinition};
use crate::runtime::RuntimeContext;
use crate::services::{HttpTransport, ReqwestTransport};

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Directory setup failed: {0}")]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error("Service readiness failed: {summary}")]
    NotReady { summary: String },

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Progress(#[from] ProgressError),

    #[error("Failed to initialise HTTP client: {0}")]
    Client(String),
}

impl BootstrapError {
    /// A short hint telling the operator what to do next.
    pub fn remediation(&self) -> String {
        match self {
            BootstrapError::Layout(LayoutError::MissingMediaDir) => {
                "Set MEDIA_DIR in .env or export it before running.".to_string()
            }
            BootstrapError::Layout(LayoutError::Io { path, .. }) => {
                format!("Check that {} is writable by the current user.", path.display())
            }
            BootstrapError::Compose(_) => {
                "Make sure Docker is running and `docker compose config` accepts the compose file.".to_string()
            }
            BootstrapError::NotReady { .. } => {
                "Inspect `docker compose logs <service>` and re-run once the containers are healthy.".to_string()
            }
            BootstrapError::Pipeline(PipelineError::Stage { source, .. }) => match source {
                IntegrationError::ApiKey(e) => format!(
                    "Start the stack once so {} is generated, then re-run.",
                    e.path().display()
                ),
                IntegrationError::Service { source, .. } if source.is_transient() => {
                    "The service may still be starting; re-run in a minute.".to_string()
                }
                _ => "Re-run with --verbose for request details.".to_string(),
            },
            BootstrapError::Pipeline(_) | BootstrapError::Progress(_) | BootstrapError::Client(_) => {
                "Re-run with --verbose for details.".to_string()
            }
        }
    }
}

/// Which phases of the workflow to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapPlan {
    pub create_layout: bool,
    pub start_services: bool,
    pub wait_for_services: bool,
    pub run_integrations: bool,
}

impl Default for BootstrapPlan {
    fn default() -> Self {
        Self::full()
    }
}

impl BootstrapPlan {
    pub fn full() -> Self {
        Self {
            create_layout: true,
            start_services: true,
            wait_for_services: true,
            run_integrations: true,
        }
    }

    /// Layout, compose and readiness; no integrations.
    pub fn setup() -> Self {
        Self {
            run_integrations: false,
            ..Self::full()
        }
    }

    /// Integrations only, against an already running stack.
    pub fn integrate() -> Self {
        Self {
            create_layout: false,
            start_services: false,
            wait_for_services: false,
            run_integrations: true,
        }
    }
}

/// What a successful run did.
#[derive(Debug, Clone)]
pub struct BootstrapReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    pub layout: Option<LayoutReport>,
    pub profile: Option<ComposeProfile>,
    pub readiness: Option<ReadinessReport>,
    pub integrations: Option<PipelineSummary>,
}

impl BootstrapReport {
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// External collaborators of a run.
#[derive(Clone)]
pub struct Collaborators {
    pub runner: Arc<dyn CommandRunner>,
    pub transport: Arc<dyn HttpTransport>,
    pub health: Arc<dyn HealthCheck>,
    pub renderer: Arc<dyn ProgressRenderer>,
}

impl Collaborators {
    /// Real processes and HTTP, progress reported through tracing.
    pub fn system(config: &BootstrapConfig) -> Result<Self, BootstrapError> {
        let transport = ReqwestTransport::new(config.http.request_timeout())
            .map_err(|e| BootstrapError::Client(e.to_string()))?;
        let health = HttpHealthCheck::new(config.readiness.request_timeout())
            .map_err(|e| BootstrapError::Client(e.to_string()))?;
        Ok(Self {
            runner: Arc::new(SystemCommandRunner::new()),
            transport: Arc::new(transport),
            health: Arc::new(health),
            renderer: Arc::new(LogRenderer::new()),
        })
    }
}

pub struct Bootstrapper {
    root_dir: PathBuf,
    runtime: RuntimeContext,
    config: BootstrapConfig,
    deps: Collaborators,
}

impl Bootstrapper {
    pub fn new(
        root_dir: impl Into<PathBuf>,
        runtime: RuntimeContext,
        config: BootstrapConfig,
        deps: Collaborators,
    ) -> Self {
        Self {
            root_dir: root_dir.into(),
            runtime,
            config,
            deps,
        }
    }

    pub fn runtime(&self) -> &RuntimeContext {
        &self.runtime
    }

    /// Run the phases selected by `plan`, stopping at the first failure.
    pub async fn run(&self, plan: &BootstrapPlan) -> Result<BootstrapReport, BootstrapError> {
        let started_at = Utc::now();
        let dry_run = self.runtime.dry_run();
        let mut report = BootstrapReport {
            started_at,
            finished_at: started_at,
            dry_run,
            layout: None,
            profile: None,
            readiness: None,
            integrations: None,
        };

        if plan.create_layout {
            report.layout = Some(ensure_layout(&self.root_dir, &self.runtime.env, dry_run)?);
        }

        if plan.start_services {
            let profile = ComposeProfile::from_env(&self.runtime.env);
            self.start_services(profile).await?;
            report.profile = Some(profile);
        }

        if plan.wait_for_services {
            if dry_run {
                info!("[dry-run] Skipping service readiness checks");
            } else {
                let readiness = self.wait_for_services().await?;
                if let Some(summary) = readiness.summary() {
                    return Err(BootstrapError::NotReady { summary });
                }
                report.readiness = Some(readiness);
            }
        }

        if plan.run_integrations {
            report.integrations = Some(self.run_integrations().await?);
        }

        report.finished_at = Utc::now();
        info!(
            "Bootstrap finished in {}s{}",
            report.duration().num_seconds(),
            if dry_run { " (dry-run)" } else { "" }
        );
        Ok(report)
    }

    async fn start_services(&self, profile: ComposeProfile) -> Result<(), BootstrapError> {
        let driver = ComposeDriver::new(self.deps.runner.clone(), &self.root_dir, self.config.compose.clone());
        let tracker = ProgressTracker::new("Docker Progress", driver.step_definitions(profile))?;
        let _live = tracker.live(self.deps.renderer.clone());
        driver.bring_up(profile, self.runtime.dry_run(), &tracker).await?;
        Ok(())
    }

    async fn wait_for_services(&self) -> Result<ReadinessReport, BootstrapError> {
        let probes = default_probes();
        let prober = ReadinessProber::from_config(self.deps.health.clone(), &self.config.readiness);
        let tracker = ProgressTracker::new(
            "Service Readiness",
            probes.iter().map(|p| StepDefinition::new(p.name.clone(), p.name.clone())),
        )?;
        let _live = tracker.live(self.deps.renderer.clone());
        info!("Waiting up to {}s for services", prober.ceiling().as_secs());
        Ok(prober.wait_for(&probes, &self.runtime.env, Some(&tracker)).await)
    }

    async fn run_integrations(&self) -> Result<PipelineSummary, BootstrapError> {
        let ctx = IntegrationContext::new(
            &self.root_dir,
            self.runtime.clone(),
            self.deps.transport.clone(),
            self.deps.runner.clone(),
            &self.config,
        );
        let pipeline = StagePipeline::standard();
        let tracker = ProgressTracker::new("Integrations", pipeline.step_definitions())?;
        let _live = tracker.live(self.deps.renderer.clone());
        let mut state = IntegrationState::new();
        Ok(pipeline.run(&ctx, &mut state, &tracker).await?)
    }
}
