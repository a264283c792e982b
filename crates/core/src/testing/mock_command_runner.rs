//! Recording command runner for testing.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::command::{CommandError, CommandOutput, CommandRunner, CommandSpec};

/// Records every command instead of running it.
///
/// Commands succeed with empty output unless a failure was scripted with
/// [`fail_on_call`](Self::fail_on_call).
///
/// # Example
///
/// ```rust,ignore
/// let runner = Arc::new(RecordingCommandRunner::new().fail_on_call(3, "pull access denied"));
/// let err = driver.bring_up(ComposeProfile::Vpn, false, &tracker).await.unwrap_err();
/// assert_eq!(runner.calls().len(), 3);
/// ```
#[derive(Debug, Default)]
pub struct RecordingCommandRunner {
    calls: Mutex<Vec<CommandSpec>>,
    failures: Mutex<Vec<(usize, String)>>,
}

impl RecordingCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the `n`th call (1-based) exit with status 1 and `stderr`.
    pub fn fail_on_call(self, n: usize, stderr: &str) -> Self {
        self.failures.lock().unwrap().push((n, stderr.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for RecordingCommandRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(spec.clone());
            calls.len()
        };
        let failure = self
            .failures
            .lock()
            .unwrap()
            .iter()
            .find(|(call, _)| *call == n)
            .map(|(_, stderr)| stderr.clone());
        match failure {
            Some(stderr) => Err(CommandError::Failed {
                command: spec.display(),
                status: Some(1),
                stderr,
            }),
            None => Ok(CommandOutput {
                code: Some(0),
                ..Default::default()
            }),
        }
    }
}
