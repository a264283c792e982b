//! Per-step progress tracking with pull-based rendering.
//!
//! A [`ProgressTracker`] owns an ordered list of [`PipelineStep`]s. Writers
//! call [`ProgressTracker::update`]; renderers only ever see complete
//! snapshots. [`ProgressTracker::live`] starts a periodic refresh that stops
//! when the returned guard is dropped.

mod render;
mod tracker;
mod types;

pub use render::{render_table, LogRenderer, NullRenderer, ProgressRenderer, TableRenderer};
pub use tracker::{LiveProgress, ProgressTracker, REFRESH_INTERVAL};
pub use types::*;
