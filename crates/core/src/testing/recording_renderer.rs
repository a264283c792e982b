//! Recording progress renderer for testing.

use std::sync::Mutex;

use crate::progress::{PipelineStep, ProgressRenderer};

/// Keeps a copy of every rendered frame.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    frames: Mutex<Vec<Vec<PipelineStep>>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<Vec<PipelineStep>> {
        self.frames.lock().unwrap().clone()
    }
}

impl ProgressRenderer for RecordingRenderer {
    fn render(&self, _title: &str, steps: &[PipelineStep]) {
        self.frames.lock().unwrap().push(steps.to_vec());
    }
}
