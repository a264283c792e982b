use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::warn;

use super::types::IntegrationError;
use crate::services::{ProwlarrClient, ServiceId};

/// Facts discovered by earlier stages for later ones.
///
/// Append-only: a recorded API key is never replaced within a run.
#[derive(Default)]
pub struct IntegrationState {
    api_keys: BTreeMap<ServiceId, String>,
    prowlarr: Option<Arc<ProwlarrClient>>,
}

impl IntegrationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when a key was already recorded for `service`.
    pub fn record_api_key(&mut self, service: ServiceId, key: impl Into<String>) -> bool {
        if self.api_keys.contains_key(&service) {
            warn!("API key for {} already recorded; keeping the first one", service);
            return false;
        }
        self.api_keys.insert(service, key.into());
        true
    }

    pub fn api_key(&self, service: ServiceId) -> Result<&str, IntegrationError> {
        self.api_keys
            .get(&service)
            .map(String::as_str)
            .ok_or_else(|| IntegrationError::MissingFact(format!("{} API key not available", service)))
    }

    pub fn has_api_key(&self, service: ServiceId) -> bool {
        self.api_keys.contains_key(&service)
    }

    pub fn set_prowlarr(&mut self, client: Arc<ProwlarrClient>) {
        if self.prowlarr.is_none() {
            self.prowlarr = Some(client);
        }
    }

    pub fn prowlarr(&self) -> Option<&Arc<ProwlarrClient>> {
        self.prowlarr.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_never_overwrites() {
        let mut state = IntegrationState::new();
        assert!(state.record_api_key(ServiceId::Sonarr, "first"));
        assert!(!state.record_api_key(ServiceId::Sonarr, "second"));
        assert_eq!(state.api_key(ServiceId::Sonarr).unwrap(), "first");
    }

    #[test]
    fn test_missing_key_is_typed_error() {
        let state = IntegrationState::new();
        let err = state.api_key(ServiceId::Radarr).unwrap_err();
        assert!(matches!(err, IntegrationError::MissingFact(ref msg) if msg == "Radarr API key not available"));
    }
}
