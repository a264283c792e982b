use async_trait::async_trait;
use tracing::{error, info};

use super::context::IntegrationContext;
use super::stages::{
    ArrClientsStage, BazarrStage, CrossSeedStage, ProwlarrStage, QbittorrentStage, RecyclarrStage, ServiceAuthStage,
};
use super::state::IntegrationState;
use super::types::{IntegrationError, PipelineError, StageOutcome};
use crate::progress::{ProgressTracker, StepDefinition, StepStatus};

/// One integration stage.
#[async_trait]
pub trait StageHandler: Send + Sync {
    /// Unique progress key.
    fn key(&self) -> &str;

    fn label(&self) -> &str;

    async fn run(
        &self,
        ctx: &IntegrationContext,
        state: &mut IntegrationState,
    ) -> Result<StageOutcome, IntegrationError>;
}

/// Outcome of every stage, in execution order.
#[derive(Debug, Clone, Default)]
pub struct PipelineSummary {
    pub outcomes: Vec<(String, StageOutcome)>,
}

impl PipelineSummary {
    pub fn get(&self, key: &str) -> Option<&StageOutcome> {
        self.outcomes.iter().find(|(k, _)| k == key).map(|(_, o)| o)
    }
}

/// Ordered list of stages.
pub struct StagePipeline {
    stages: Vec<Box<dyn StageHandler>>,
}

impl StagePipeline {
    pub fn new(stages: Vec<Box<dyn StageHandler>>) -> Self {
        Self { stages }
    }

    /// qBittorrent → download clients → Prowlarr → Bazarr → Recyclarr →
    /// Cross-Seed → UI credentials.
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(QbittorrentStage),
            Box::new(ArrClientsStage),
            Box::new(ProwlarrStage),
            Box::new(BazarrStage),
            Box::new(RecyclarrStage),
            Box::new(CrossSeedStage),
            Box::new(ServiceAuthStage),
        ])
    }

    pub fn step_definitions(&self) -> Vec<StepDefinition> {
        self.stages
            .iter()
            .map(|stage| StepDefinition::new(stage.key(), stage.label()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage in order, reporting through `tracker`.
    ///
    /// `tracker` must have been built from [`step_definitions`](Self::step_definitions).
    pub async fn run(
        &self,
        ctx: &IntegrationContext,
        state: &mut IntegrationState,
        tracker: &ProgressTracker,
    ) -> Result<PipelineSummary, PipelineError> {
        let mut summary = PipelineSummary::default();

        for stage in &self.stages {
            tracker.set(stage.key(), StepStatus::Running, "Running")?;
            info!("Stage {} started", stage.key());

            match stage.run(ctx, state).await {
                Ok(outcome) => {
                    tracker.set(stage.key(), outcome.status.into(), outcome.detail.clone())?;
                    info!("Stage {} {:?}: {}", stage.key(), outcome.status, outcome.detail);
                    summary.outcomes.push((stage.key().to_string(), outcome));
                }
                Err(e) => {
                    error!("Stage {} failed: {}", stage.key(), e);
                    tracker.set(stage.key(), StepStatus::Failed, e.to_string())?;
                    return Err(PipelineError::Stage {
                        key: stage.key().to_string(),
                        label: stage.label().to_string(),
                        source: e,
                    });
                }
            }
        }

        Ok(summary)
    }
}
