//! Testing utilities and mock implementations.
//!
//! Every external seam of the bootstrapper (HTTP, subprocesses, health
//! probes, progress rendering) has an in-memory stand-in here, so the
//! pipeline can be exercised end to end without Docker or live services.
//!
//! # Example
//!
//! ```rust,ignore
//! use servarr_core::testing::{MockTransport, RecordingCommandRunner};
//!
//! let transport = Arc::new(MockTransport::new());
//! transport.on(Method::Get, "/api/v3/rootfolder", |_| ApiResponse::ok_json(&json!([])));
//!
//! let runner = Arc::new(RecordingCommandRunner::new().fail_on_call(3, "pull failed"));
//! // ...hand both to an IntegrationContext or ComposeDriver
//! ```

mod mock_command_runner;
mod mock_transport;
mod recording_renderer;
mod scripted_health;

pub use mock_command_runner::RecordingCommandRunner;
pub use mock_transport::MockTransport;
pub use recording_renderer::RecordingRenderer;
pub use scripted_health::ScriptedHealthCheck;

/// On-disk fixtures mirroring what the containers write on first start.
pub mod fixtures {
    use std::fs;
    use std::io;
    use std::path::Path;

    use crate::services::ServiceId;

    /// Write `config/<service>/config.xml` with the given API key.
    pub fn write_arr_config(root: &Path, service: ServiceId, api_key: &str) -> io::Result<()> {
        let dir = root.join("config").join(service.as_str());
        fs::create_dir_all(&dir)?;
        fs::write(
            dir.join("config.xml"),
            format!(
                "<Config>\n  <Port>0</Port>\n  <ApiKey>{}</ApiKey>\n  <AuthenticationMethod>None</AuthenticationMethod>\n</Config>\n",
                api_key
            ),
        )
    }

    /// Write `config/bazarr/config/config.yaml` with the given API key.
    pub fn write_bazarr_config(root: &Path, api_key: &str) -> io::Result<()> {
        let dir = root.join("config").join("bazarr").join("config");
        fs::create_dir_all(&dir)?;
        fs::write(
            dir.join("config.yaml"),
            format!("general:\n  port: 6767\nauth:\n  type: null\n  apikey: {}\n", api_key),
        )
    }

    /// API key files for every service the pipeline reads.
    pub fn write_all_api_keys(root: &Path) -> io::Result<()> {
        write_arr_config(root, ServiceId::Sonarr, "sonarr-key")?;
        write_arr_config(root, ServiceId::Radarr, "radarr-key")?;
        write_arr_config(root, ServiceId::Prowlarr, "prowlarr-key")?;
        write_bazarr_config(root, "bazarr-key")
    }
}
