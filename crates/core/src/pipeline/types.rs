use serde::Serialize;
use thiserror::Error;

use crate::progress::{ProgressError, StepStatus};
use crate::services::{ApiKeyError, ServiceError};

/// Errors raised by a stage handler.
#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error(transparent)]
    ApiKey(#[from] ApiKeyError),

    #[error("{service}: {source}")]
    Service {
        service: String,
        #[source]
        source: ServiceError,
    },

    #[error("Missing prerequisite: {0}")]
    MissingFact(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl IntegrationError {
    pub fn service(service: impl Into<String>) -> impl FnOnce(ServiceError) -> Self {
        let service = service.into();
        move |source| IntegrationError::Service { service, source }
    }
}

/// Errors from running the pipeline as a whole.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Stage '{label}' failed: {source}")]
    Stage {
        key: String,
        label: String,
        #[source]
        source: IntegrationError,
    },

    #[error(transparent)]
    Progress(#[from] ProgressError),
}

/// Non-error result of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Done,
    Skipped,
}

impl From<StageStatus> for StepStatus {
    fn from(status: StageStatus) -> Self {
        match status {
            StageStatus::Done => StepStatus::Done,
            StageStatus::Skipped => StepStatus::Skipped,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageOutcome {
    pub status: StageStatus,
    pub detail: String,
}

impl StageOutcome {
    pub fn done(detail: impl Into<String>) -> Self {
        Self {
            status: StageStatus::Done,
            detail: detail.into(),
        }
    }

    pub fn skipped(detail: impl Into<String>) -> Self {
        Self {
            status: StageStatus::Skipped,
            detail: detail.into(),
        }
    }
}
