//! Integration stage pipeline.
//!
//! Stages run strictly in order over a shared [`IntegrationState`]. The first
//! failing stage aborts the run; stages after it stay pending.

mod context;
mod runner;
mod stages;
mod state;
mod types;

pub use context::{IntegrationContext, DEFAULT_MEDIA_DIR};
pub use runner::{PipelineSummary, StageHandler, StagePipeline};
pub use stages::{
    ArrClientsStage, ArrTarget, BazarrStage, CrossSeedStage, ProwlarrStage, QbittorrentStage, RecyclarrStage,
    ServiceAuthStage, ARR_TARGETS,
};
pub use state::IntegrationState;
pub use types::*;
