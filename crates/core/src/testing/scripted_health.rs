//! Scripted health check for testing.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::probe::HealthCheck;

#[derive(Debug, Default)]
struct Script {
    responses: Vec<Result<u16, String>>,
    calls: usize,
}

/// [`HealthCheck`] answering from per-URL scripts.
///
/// Each call consumes the next scripted response; the last one repeats once
/// the script is exhausted. URLs without a script are refused.
#[derive(Debug, Default)]
pub struct ScriptedHealthCheck {
    scripts: Mutex<HashMap<String, Script>>,
    unscripted_calls: Mutex<usize>,
}

impl ScriptedHealthCheck {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer `url` with `status`.
    pub fn set_status(&self, url: &str, status: u16) {
        self.script(url, vec![Ok(status)]);
    }

    pub fn script(&self, url: &str, responses: Vec<Result<u16, String>>) {
        self.scripts.lock().unwrap().insert(
            url.to_string(),
            Script {
                responses,
                calls: 0,
            },
        );
    }

    pub fn calls_for(&self, url: &str) -> usize {
        self.scripts.lock().unwrap().get(url).map(|s| s.calls).unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        let scripted: usize = self.scripts.lock().unwrap().values().map(|s| s.calls).sum();
        scripted + *self.unscripted_calls.lock().unwrap()
    }
}

#[async_trait]
impl HealthCheck for ScriptedHealthCheck {
    async fn check(&self, url: &str) -> Result<u16, String> {
        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(url) {
            Some(script) if !script.responses.is_empty() => {
                let idx = script.calls.min(script.responses.len() - 1);
                script.calls += 1;
                script.responses[idx].clone()
            }
            _ => {
                *self.unscripted_calls.lock().unwrap() += 1;
                Err("connection refused".to_string())
            }
        }
    }
}
