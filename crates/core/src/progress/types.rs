use serde::Serialize;
use thiserror::Error;

/// Errors raised by the progress tracker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgressError {
    #[error("Unknown step: {0}")]
    UnknownStep(String),

    #[error("Duplicate step key: {0}")]
    DuplicateStep(String),

    #[error("Invalid transition for step {key}: {from} -> {to}")]
    InvalidTransition {
        key: String,
        from: StepStatus,
        to: StepStatus,
    },
}

/// Lifecycle of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Done,
    Skipped,
    Failed,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Running => "running",
            StepStatus::Done => "done",
            StepStatus::Skipped => "skipped",
            StepStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StepStatus::Done | StepStatus::Skipped | StepStatus::Failed)
    }

    /// Transitions only move forward. Re-applying the current status is
    /// allowed so callers can refresh details without tracking state.
    pub fn can_transition_to(&self, next: StepStatus) -> bool {
        if *self == next {
            return true;
        }
        match self {
            StepStatus::Pending => matches!(
                next,
                StepStatus::Running | StepStatus::Skipped | StepStatus::Failed
            ),
            StepStatus::Running => next.is_terminal(),
            _ => false,
        }
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A step as seen by renderers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineStep {
    pub key: String,
    pub label: String,
    pub status: StepStatus,
    pub details: String,
}

/// Declaration of a step before a run starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDefinition {
    pub key: String,
    pub label: String,
    pub initial_detail: String,
}

impl StepDefinition {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            initial_detail: "Waiting".to_string(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.initial_detail = detail.into();
        self
    }
}
