use std::collections::HashMap;
use std::io::Write;
use std::sync::Mutex;

use tracing::{info, warn};

use super::types::{PipelineStep, StepStatus};

/// Draws a snapshot of steps.
pub trait ProgressRenderer: Send + Sync {
    fn render(&self, title: &str, steps: &[PipelineStep]);
}

/// Renders nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl ProgressRenderer for NullRenderer {
    fn render(&self, _title: &str, _steps: &[PipelineStep]) {}
}

/// Emits a tracing event for each step whose status or details changed
/// since the previous frame.
#[derive(Debug, Default)]
pub struct LogRenderer {
    last: Mutex<HashMap<String, (StepStatus, String)>>,
}

impl LogRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressRenderer for LogRenderer {
    fn render(&self, title: &str, steps: &[PipelineStep]) {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        for step in steps {
            let current = (step.status, step.details.clone());
            if last.get(&step.key) == Some(&current) {
                continue;
            }
            // Pending steps are only interesting once they carry a real detail.
            if step.status == StepStatus::Pending && !last.contains_key(&step.key) {
                last.insert(step.key.clone(), current);
                continue;
            }
            match step.status {
                StepStatus::Failed => warn!(
                    stage = %step.key,
                    "[{}] {}: {} ({})",
                    title,
                    step.label,
                    step.status,
                    step.details
                ),
                _ => info!(
                    stage = %step.key,
                    "[{}] {}: {} ({})",
                    title,
                    step.label,
                    step.status,
                    step.details
                ),
            }
            last.insert(step.key.clone(), current);
        }
    }
}

/// Plain-text status table.
pub fn render_table(title: &str, steps: &[PipelineStep]) -> String {
    let label_width = steps
        .iter()
        .map(|s| s.label.chars().count())
        .max()
        .unwrap_or(0)
        .max("Step".len());
    let status_width = "skipped".len();

    let mut out = String::new();
    out.push_str(title);
    out.push('\n');
    out.push_str(&format!(
        "  {:<label_width$}  {:<status_width$}  {}\n",
        "Step", "Status", "Details"
    ));
    for step in steps {
        out.push_str(&format!(
            "  {:<label_width$}  {:<status_width$}  {}\n",
            step.label,
            step.status.as_str(),
            step.details
        ));
    }
    out
}

/// Writes [`render_table`] output to a writer, typically stderr.
pub struct TableRenderer<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> TableRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out: Mutex::new(out) }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl<W: Write + Send> ProgressRenderer for TableRenderer<W> {
    fn render(&self, title: &str, steps: &[PipelineStep]) {
        let table = render_table(title, steps);
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        let _ = out.write_all(table.as_bytes()).and_then(|_| out.flush());
    }
}
