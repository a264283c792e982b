use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use super::render::ProgressRenderer;
use super::types::{PipelineStep, ProgressError, StepDefinition, StepStatus};

/// How often a live view re-renders.
pub const REFRESH_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug)]
struct Inner {
    steps: Vec<PipelineStep>,
    index: HashMap<String, usize>,
    /// Bumped on every applied update.
    revision: u64,
}

/// Thread-safe table of step statuses.
///
/// Cloning is cheap and all clones share the same steps.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    title: Arc<str>,
    inner: Arc<Mutex<Inner>>,
}

impl ProgressTracker {
    /// Create a tracker with every step `pending`.
    pub fn new(
        title: impl Into<String>,
        definitions: impl IntoIterator<Item = StepDefinition>,
    ) -> Result<Self, ProgressError> {
        let mut steps = Vec::new();
        let mut index = HashMap::new();
        for def in definitions {
            if index.insert(def.key.clone(), steps.len()).is_some() {
                return Err(ProgressError::DuplicateStep(def.key));
            }
            steps.push(PipelineStep {
                key: def.key,
                label: def.label,
                status: StepStatus::Pending,
                details: def.initial_detail,
            });
        }

        Ok(Self {
            title: Arc::from(title.into()),
            inner: Arc::new(Mutex::new(Inner {
                steps,
                index,
                revision: 0,
            })),
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    // Rendering must keep working even if a writer panicked mid-run.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Update a step's status and/or details. `None` leaves a field as is.
    pub fn update(
        &self,
        key: &str,
        status: Option<StepStatus>,
        details: Option<String>,
    ) -> Result<(), ProgressError> {
        let mut inner = self.lock();
        let idx = *inner
            .index
            .get(key)
            .ok_or_else(|| ProgressError::UnknownStep(key.to_string()))?;

        let step = &mut inner.steps[idx];
        if let Some(next) = status {
            if !step.status.can_transition_to(next) {
                return Err(ProgressError::InvalidTransition {
                    key: key.to_string(),
                    from: step.status,
                    to: next,
                });
            }
            step.status = next;
        }
        if let Some(details) = details {
            step.details = details;
        }
        inner.revision += 1;
        Ok(())
    }

    /// Shorthand for setting both status and details.
    pub fn set(
        &self,
        key: &str,
        status: StepStatus,
        details: impl Into<String>,
    ) -> Result<(), ProgressError> {
        self.update(key, Some(status), Some(details.into()))
    }

    /// All steps in declared order.
    pub fn snapshot(&self) -> Vec<PipelineStep> {
        self.lock().steps.clone()
    }

    pub fn step(&self, key: &str) -> Option<PipelineStep> {
        let inner = self.lock();
        inner.index.get(key).map(|&idx| inner.steps[idx].clone())
    }

    pub fn revision(&self) -> u64 {
        self.lock().revision
    }

    fn snapshot_with_revision(&self) -> (u64, Vec<PipelineStep>) {
        let inner = self.lock();
        (inner.revision, inner.steps.clone())
    }

    /// Start rendering this tracker periodically.
    ///
    /// An initial frame is rendered immediately. The refresh task only runs
    /// when called inside a tokio runtime; otherwise the guard still renders
    /// the final frame when dropped.
    pub fn live(&self, renderer: Arc<dyn ProgressRenderer>) -> LiveProgress {
        let (revision, steps) = self.snapshot_with_revision();
        renderer.render(&self.title, &steps);

        let task = tokio::runtime::Handle::try_current().ok().map(|handle| {
            let tracker = self.clone();
            let renderer = Arc::clone(&renderer);
            handle.spawn(async move {
                let mut last_revision = revision;
                let mut ticker = tokio::time::interval(REFRESH_INTERVAL);
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    let (revision, steps) = tracker.snapshot_with_revision();
                    if revision != last_revision {
                        renderer.render(&tracker.title, &steps);
                        last_revision = revision;
                    }
                }
            })
        });

        if task.is_none() {
            debug!("No async runtime available; live progress renders on drop only");
        }

        LiveProgress {
            tracker: self.clone(),
            renderer,
            task,
        }
    }
}

/// Guard returned by [`ProgressTracker::live`].
///
/// Dropping it stops the refresh task and renders one final frame.
pub struct LiveProgress {
    tracker: ProgressTracker,
    renderer: Arc<dyn ProgressRenderer>,
    task: Option<JoinHandle<()>>,
}

impl LiveProgress {
    pub fn tracker(&self) -> &ProgressTracker {
        &self.tracker
    }
}

impl Drop for LiveProgress {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        let steps = self.tracker.snapshot();
        self.renderer.render(self.tracker.title(), &steps);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingRenderer;

    fn tracker() -> ProgressTracker {
        ProgressTracker::new(
            "Test",
            vec![
                StepDefinition::new("one", "First"),
                StepDefinition::new("two", "Second"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_new_steps_are_pending_in_order() {
        let snapshot = tracker().snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].key, "one");
        assert_eq!(snapshot[1].key, "two");
        assert!(snapshot.iter().all(|s| s.status == StepStatus::Pending));
        assert_eq!(snapshot[0].details, "Waiting");
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let result = ProgressTracker::new(
            "Dup",
            vec![StepDefinition::new("a", "A"), StepDefinition::new("a", "B")],
        );
        assert_eq!(result.unwrap_err(), ProgressError::DuplicateStep("a".to_string()));
    }

    #[test]
    fn test_update_leaves_omitted_fields() {
        let t = tracker();
        t.update("one", None, Some("Working".to_string())).unwrap();
        let step = t.step("one").unwrap();
        assert_eq!(step.status, StepStatus::Pending);
        assert_eq!(step.details, "Working");

        t.update("one", Some(StepStatus::Running), None).unwrap();
        let step = t.step("one").unwrap();
        assert_eq!(step.status, StepStatus::Running);
        assert_eq!(step.details, "Working");
    }

    #[test]
    fn test_unknown_step() {
        let err = tracker().update("nope", Some(StepStatus::Done), None).unwrap_err();
        assert_eq!(err, ProgressError::UnknownStep("nope".to_string()));
    }

    #[test]
    fn test_terminal_step_rejects_revert() {
        let t = tracker();
        t.set("one", StepStatus::Running, "go").unwrap();
        t.set("one", StepStatus::Done, "ok").unwrap();
        let err = t.set("one", StepStatus::Running, "again").unwrap_err();
        assert!(matches!(err, ProgressError::InvalidTransition { .. }));
        assert_eq!(t.step("one").unwrap().details, "ok");
    }

    #[test]
    fn test_revision_counts_updates() {
        let t = tracker();
        assert_eq!(t.revision(), 0);
        t.set("one", StepStatus::Running, "go").unwrap();
        t.update("two", None, Some("x".to_string())).unwrap();
        assert_eq!(t.revision(), 2);
    }

    #[test]
    fn test_live_without_runtime_renders_initial_and_final() {
        let renderer = Arc::new(RecordingRenderer::new());
        let t = tracker();
        {
            let _live = t.live(renderer.clone());
            t.set("one", StepStatus::Running, "go").unwrap();
        }
        let frames = renderer.frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0][0].status, StepStatus::Pending);
        assert_eq!(frames[1][0].status, StepStatus::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_refreshes_on_change() {
        let renderer = Arc::new(RecordingRenderer::new());
        let t = tracker();
        let live = t.live(renderer.clone());

        t.set("one", StepStatus::Running, "go").unwrap();
        tokio::time::sleep(REFRESH_INTERVAL * 2).await;
        let after_change = renderer.frames().len();
        assert!(after_change >= 2);

        // No changes: no extra frames.
        tokio::time::sleep(REFRESH_INTERVAL * 4).await;
        assert_eq!(renderer.frames().len(), after_change);

        drop(live);
        let frames = renderer.frames();
        assert_eq!(frames.len(), after_change + 1);
        assert_eq!(frames.last().unwrap()[0].details, "go");
    }

    #[tokio::test]
    async fn test_final_frame_rendered_on_early_return() {
        fn failing(t: &ProgressTracker, renderer: Arc<RecordingRenderer>) -> Result<(), ProgressError> {
            let _live = t.live(renderer);
            t.set("one", StepStatus::Running, "go")?;
            t.set("one", StepStatus::Failed, "boom")?;
            t.set("missing", StepStatus::Running, "never")?;
            Ok(())
        }

        let renderer = Arc::new(RecordingRenderer::new());
        let t = tracker();
        assert!(failing(&t, renderer.clone()).is_err());
        let frames = renderer.frames();
        let last = frames.last().unwrap();
        assert_eq!(last[0].status, StepStatus::Failed);
        assert_eq!(last[1].status, StepStatus::Pending);
    }
}
