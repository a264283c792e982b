use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::retry::RetryPolicy;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BootstrapConfig {
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub readiness: ReadinessConfig,
    #[serde(default)]
    pub compose: ComposeConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

/// Retry settings applied to every REST call made by the integration stages
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    /// Total invocations, including the first one
    #[serde(default = "default_retry_attempts")]
    pub attempts: u32,
    /// Fixed wait between invocations
    #[serde(default = "default_retry_delay")]
    pub delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_retry_attempts(),
            delay_secs: default_retry_delay(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self, dry_run: bool) -> RetryPolicy {
        RetryPolicy::new(self.attempts, Duration::from_secs(self.delay_secs)).with_dry_run(dry_run)
    }
}

fn default_retry_attempts() -> u32 {
    5
}

fn default_retry_delay() -> u64 {
    3
}

/// Post bring-up readiness wait
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReadinessConfig {
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_probe_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            interval_secs: default_interval(),
            request_timeout_secs: default_probe_timeout(),
        }
    }
}

impl ReadinessConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_max_rounds() -> u32 {
    20
}

fn default_interval() -> u64 {
    3
}

fn default_probe_timeout() -> u64 {
    3
}

/// docker compose invocation settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ComposeConfig {
    /// Executable providing the `compose` subcommand
    #[serde(default = "default_program")]
    pub program: String,
    /// Auxiliary service whose image is built locally before pulling
    #[serde(default = "default_health_service")]
    pub health_service: String,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            health_service: default_health_service(),
        }
    }
}

fn default_program() -> String {
    "docker".to_string()
}

fn default_health_service() -> String {
    "health-server".to_string()
}

/// REST client settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_http_timeout(),
        }
    }
}

impl HttpConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_http_timeout() -> u64 {
    10
}
