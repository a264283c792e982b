//! Concurrent HTTP readiness probing.

mod health;
mod prober;
mod types;

pub use health::{HealthCheck, HttpHealthCheck};
pub use prober::ReadinessProber;
pub use types::*;
