//! Command runner backed by real OS processes.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error, info};

use super::{CommandError, CommandOutput, CommandRunner, CommandSpec};

/// Runs commands with `tokio::process`, capturing stdout and stderr.
#[derive(Debug, Clone, Default)]
pub struct SystemCommandRunner;

impl SystemCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        let rendered = spec.display();
        info!("Running command: {}", rendered);

        let mut command = Command::new(&spec.program);
        command.args(&spec.args).kill_on_drop(true);
        if let Some(cwd) = &spec.cwd {
            command.current_dir(cwd);
        }
        for (key, value) in &spec.env {
            command.env(key, value);
        }

        let output = command.output().await.map_err(|e| CommandError::Spawn {
            command: rendered.clone(),
            message: e.to_string(),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !stdout.is_empty() {
            debug!("{}", stdout);
        }
        if !stderr.is_empty() {
            debug!("{}", stderr);
        }

        if !output.status.success() {
            error!("Command failed ({}): {}", rendered, stderr);
            return Err(CommandError::Failed {
                command: rendered,
                status: output.status.code(),
                stderr,
            });
        }

        Ok(CommandOutput {
            code: output.status.code(),
            stdout,
            stderr,
        })
    }
}
