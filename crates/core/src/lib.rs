pub mod bootstrap;
pub mod command;
pub mod compose;
pub mod config;
pub mod layout;
pub mod pipeline;
pub mod probe;
pub mod progress;
pub mod retry;
pub mod runtime;
pub mod sanity;
pub mod services;
pub mod testing;

pub use bootstrap::{BootstrapError, BootstrapPlan, BootstrapReport, Bootstrapper, Collaborators};
pub use config::{
    load_config, load_config_from_str, load_config_or_default, validate_config, BootstrapConfig, ConfigError,
};
pub use retry::{retry, RetryPolicy};
pub use runtime::{build_runtime_context, ContextError, RuntimeContext, RuntimeOptions};
pub use sanity::{render_report, run_sanity_scan, SanityReport, SanityStatus};
