//! Pre-flight checks run before (or instead of) a bootstrap.

mod scan;
mod types;

pub use scan::{run_sanity_scan, REQUIRED_CONFIG_DIRS, REQUIRED_ENV_KEYS};
pub use types::*;
