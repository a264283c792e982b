//! Types for command execution.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised while running an external command.
#[derive(Debug, Clone, Error)]
pub enum CommandError {
    #[error("Failed to start `{command}`: {message}")]
    Spawn { command: String, message: String },

    #[error("Command `{command}` exited with {}: {stderr}", status.map(|c| c.to_string()).unwrap_or_else(|| "signal".to_string()))]
    Failed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },
}

impl CommandError {
    /// The rendered command line.
    pub fn command(&self) -> &str {
        match self {
            CommandError::Spawn { command, .. } | CommandError::Failed { command, .. } => command,
        }
    }

    /// Captured stderr, or the spawn failure message.
    pub fn stderr(&self) -> &str {
        match self {
            CommandError::Spawn { message, .. } => message,
            CommandError::Failed { stderr, .. } => stderr,
        }
    }
}

/// A command to execute: argv, working directory and environment overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Variables set on top of the inherited process environment.
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Value of an override, if set.
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Command line as a single string, for logs and error messages.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Output of a successful command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Executes external commands.
///
/// Implementations return `Err(CommandError::Failed)` on a non-zero exit.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_joins_argv() {
        let spec = CommandSpec::new("docker").args(["compose", "up", "-d"]);
        assert_eq!(spec.display(), "docker compose up -d");
    }

    #[test]
    fn test_env_value_prefers_last_override() {
        let spec = CommandSpec::new("docker")
            .env("COMPOSE_PROFILES", "vpn")
            .env("COMPOSE_PROFILES", "no-vpn");
        assert_eq!(spec.env_value("COMPOSE_PROFILES"), Some("no-vpn"));
        assert_eq!(spec.env_value("OTHER"), None);
    }

    #[test]
    fn test_error_display() {
        let err = CommandError::Failed {
            command: "docker compose pull".to_string(),
            status: Some(1),
            stderr: "no such image".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Command `docker compose pull` exited with 1: no such image"
        );
        assert_eq!(err.command(), "docker compose pull");
        assert_eq!(err.stderr(), "no such image");
    }
}
