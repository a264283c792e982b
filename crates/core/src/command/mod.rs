//! External process execution.
//!
//! Everything that shells out (compose lifecycle, `docker exec`, `docker cp`,
//! sanity checks) goes through the [`CommandRunner`] trait so tests can
//! substitute a recording double.

mod system;
mod types;

pub use system::SystemCommandRunner;
pub use types::*;
