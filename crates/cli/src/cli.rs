//! Command-line interface for the Servarr bootstrapper.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use servarr_core::probe::ReadinessProber;
use servarr_core::progress::{LogRenderer, TableRenderer};
use servarr_core::{
    build_runtime_context, load_config_or_default, render_report, run_sanity_scan, validate_config,
    BootstrapConfig, BootstrapPlan, Bootstrapper, Collaborators, RuntimeContext, RuntimeOptions,
};

/// Config file picked up from the stack root when `--config` is not given.
const DEFAULT_CONFIG_FILE: &str = "bootstrap.toml";

/// Bring up a Servarr media stack and wire its services together
#[derive(Parser, Debug)]
#[command(name = "servarr-bootstrap")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Bring up a Servarr media stack and wire its services together", long_about = None)]
pub struct Cli {
    /// Log what would change without touching containers, files or APIs
    #[arg(global = true, long = "dry-run")]
    pub dry_run: bool,

    /// Never prompt; fail when required values are missing
    #[arg(global = true, long = "non-interactive")]
    pub non_interactive: bool,

    /// Enable debug logging
    #[arg(global = true, long = "verbose", short = 'v')]
    pub verbose: bool,

    /// Stack directory containing docker-compose.yml and .env
    #[arg(global = true, long = "root", value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Bootstrapper settings (TOML)
    #[arg(global = true, long = "config", value_name = "FILE", env = "SERVARR_BOOTSTRAP_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Sanity scan, then the full workflow (default)
    Run,
    /// Sanity scan only
    Check,
    /// Directories, containers and readiness; no service configuration
    Setup,
    /// Configure services of an already running stack
    Integrate,
}

impl Commands {
    fn requires_credentials(&self) -> bool {
        matches!(self, Commands::Run | Commands::Integrate)
    }
}

impl Cli {
    pub fn options(&self) -> RuntimeOptions {
        RuntimeOptions {
            dry_run: self.dry_run,
            non_interactive: self.non_interactive,
            verbose: self.verbose,
        }
    }

    pub fn root_dir(&self) -> Result<PathBuf> {
        match &self.root {
            Some(root) => Ok(root.clone()),
            None => std::env::current_dir().context("Failed to determine the current directory"),
        }
    }

    /// `--config`, else `bootstrap.toml` in the stack root when present.
    pub fn config_path(&self, root_dir: &Path) -> Option<PathBuf> {
        self.config.clone().or_else(|| {
            let candidate = root_dir.join(DEFAULT_CONFIG_FILE);
            candidate.exists().then_some(candidate)
        })
    }

    pub async fn run(self) -> Result<()> {
        let command = self.command.unwrap_or(Commands::Run);
        let root_dir = self.root_dir()?;

        let config_path = self.config_path(&root_dir);
        let config = load_config_or_default(config_path.as_deref()).with_context(|| match &config_path {
            Some(path) => format!("Failed to load config from {:?}", path),
            None => "Failed to load default config".to_string(),
        })?;
        validate_config(&config).context("Configuration validation failed")?;

        let runtime = build_runtime_context(
            &root_dir,
            self.options(),
            std::env::vars(),
            command.requires_credentials(),
        )
        .context("Configuration error")?;
        info!(
            "Stack root {} (dry_run={}, non_interactive={}, ci={})",
            root_dir.display(),
            runtime.options.dry_run,
            runtime.options.non_interactive,
            runtime.ci
        );

        let mut deps = Collaborators::system(&config)?;
        if !runtime.options.non_interactive && std::io::stderr().is_terminal() {
            deps.renderer = Arc::new(TableRenderer::new(std::io::stderr()));
        } else {
            deps.renderer = Arc::new(LogRenderer::new());
        }

        let plan = match command {
            Commands::Check => return check(&root_dir, &runtime, &config, &deps).await,
            Commands::Run => {
                check(&root_dir, &runtime, &config, &deps).await.or_else(|e| {
                    if runtime.options.dry_run {
                        info!("[dry-run] Continuing despite sanity errors");
                        Ok(())
                    } else {
                        Err(e)
                    }
                })?;
                BootstrapPlan::full()
            }
            Commands::Setup => BootstrapPlan::setup(),
            Commands::Integrate => BootstrapPlan::integrate(),
        };

        let bootstrapper = Bootstrapper::new(&root_dir, runtime, config, deps);
        let report = bootstrapper.run(&plan).await?;
        if let Some(summary) = &report.integrations {
            for (key, outcome) in &summary.outcomes {
                info!("{}: {}", key, outcome.detail);
            }
        }
        info!(
            "Done in {}s{}",
            report.duration().num_seconds(),
            if report.dry_run { " (dry-run)" } else { "" }
        );
        Ok(())
    }
}

async fn check(
    root_dir: &Path,
    runtime: &RuntimeContext,
    config: &BootstrapConfig,
    deps: &Collaborators,
) -> Result<()> {
    let prober = ReadinessProber::from_config(deps.health.clone(), &config.readiness);
    let report = run_sanity_scan(root_dir, runtime, deps.runner.as_ref(), &prober, &config.compose.program).await;
    eprint!("{}", render_report(&report));
    if report.has_errors() {
        bail!("Sanity scan found {} error(s)", report.counts().error);
    }
    Ok(())
}
