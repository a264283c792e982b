//! Clients for the applications in the stack.
//!
//! REST clients talk through [`HttpTransport`]; on-disk configurators
//! (Cross-Seed, Recyclarr) edit files under `config/` and shell out through
//! [`CommandRunner`](crate::command::CommandRunner) where a container has to
//! be poked. Every `ensure_*` operation reads first and only mutates when the
//! remote state differs, returning whether anything changed.

mod api;
mod api_keys;
mod arr;
mod bazarr;
mod cross_seed;
mod error;
mod gluetun;
mod prowlarr;
mod qbittorrent;
mod recyclarr;
mod transport;

pub use api_keys::{read_arr_api_key, read_bazarr_api_key, read_prowlarr_api_key, ApiKeyError};
pub use arr::{ArrClient, DownloadClientSettings};
pub use bazarr::{ArrConnection, BazarrClient, LANGUAGE_PROFILE_NAME, LANGUAGE_PROFILE_TAG};
pub use cross_seed::{CrossSeedConfigurator, CrossSeedTargets};
pub use error::ServiceError;
pub use gluetun::GluetunClient;
pub use prowlarr::{IndexerSummary, ProwlarrClient};
pub use qbittorrent::{QbittorrentClient, DEFAULT_QBIT_PASSWORD, DEFAULT_QBIT_USERNAME};
pub use recyclarr::RecyclarrManager;
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Method, RequestBody, ReqwestTransport};

use serde::{Deserialize, Serialize};

/// Services whose facts (API keys, client handles) flow between stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceId {
    Sonarr,
    Radarr,
    Prowlarr,
    Bazarr,
    Qbittorrent,
}

impl ServiceId {
    /// Directory name under `config/` and container hostname.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceId::Sonarr => "sonarr",
            ServiceId::Radarr => "radarr",
            ServiceId::Prowlarr => "prowlarr",
            ServiceId::Bazarr => "bazarr",
            ServiceId::Qbittorrent => "qbittorrent",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ServiceId::Sonarr => "Sonarr",
            ServiceId::Radarr => "Radarr",
            ServiceId::Prowlarr => "Prowlarr",
            ServiceId::Bazarr => "Bazarr",
            ServiceId::Qbittorrent => "qBittorrent",
        }
    }
}

impl std::fmt::Display for ServiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}
