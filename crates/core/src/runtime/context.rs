use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::env::{load_environment_data, EnvironmentData};

const CI_ENV_VARS: [&str; 5] = ["CI", "GITHUB_ACTIONS", "BUILDKITE", "TF_BUILD", "TEAMCITY_VERSION"];

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Failed to read {path}: {message}")]
    EnvFile { path: String, message: String },

    #[error("Missing required value for {0}. Provide it via environment variables when running non-interactively.")]
    MissingValue(String),
}

/// Command-line level flags controlling overall behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeOptions {
    pub dry_run: bool,
    pub non_interactive: bool,
    pub verbose: bool,
}

/// Shared UI credentials applied across services.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }

    /// Both halves, or nothing.
    pub fn pair(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => Some((u, p)),
            _ => None,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Aggregated runtime settings shared across bootstrap tasks.
#[derive(Debug, Clone, Default)]
pub struct RuntimeContext {
    pub options: RuntimeOptions,
    pub ci: bool,
    pub env: EnvironmentData,
    pub credentials: Credentials,
}

impl RuntimeContext {
    pub fn dry_run(&self) -> bool {
        self.options.dry_run
    }
}

/// True when any of the well-known CI variables is set to a truthy value.
pub fn detect_ci(env: &HashMap<String, String>) -> bool {
    CI_ENV_VARS.iter().any(|key| {
        env.get(*key)
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false)
    })
}

/// Load configuration and return a hydrated runtime context.
///
/// CI environments force non-interactive mode. In non-interactive mode a
/// missing `SERVARR_USERNAME`/`SERVARR_PASSWORD` is an error when
/// `require_credentials` is set; interactively they are left unset and the
/// stages that need them skip themselves.
pub fn build_runtime_context<I>(
    root_dir: &Path,
    options: RuntimeOptions,
    process_env: I,
    require_credentials: bool,
) -> Result<RuntimeContext, ContextError>
where
    I: IntoIterator<Item = (String, String)>,
{
    let env = load_environment_data(root_dir, process_env)?;
    let ci = detect_ci(&env.merged);

    let mut options = options;
    if ci && !options.non_interactive {
        info!("CI environment detected; forcing non-interactive mode.");
        options.non_interactive = true;
    }

    let username = env.get("SERVARR_USERNAME").map(str::to_string);
    let password = env.get("SERVARR_PASSWORD").map(str::to_string);

    if require_credentials {
        for (key, value) in [("SERVARR_USERNAME", &username), ("SERVARR_PASSWORD", &password)] {
            if value.is_some() {
                debug!("{} provided via environment", key);
            } else if options.non_interactive {
                return Err(ContextError::MissingValue(key.to_string()));
            } else {
                warn!("{} not set; credential-dependent steps will be skipped", key);
            }
        }
    }

    Ok(RuntimeContext {
        options,
        ci,
        env,
        credentials: Credentials { username, password },
    })
}
