//! Runtime context shared by every bootstrap component.
//!
//! Built once by the binary from CLI flags, the stack's `.env` file and the
//! process environment, then passed explicitly into each component.

mod context;
mod env;

pub use context::{
    build_runtime_context, detect_ci, ContextError, Credentials, RuntimeContext, RuntimeOptions,
};
pub use env::{load_environment_data, parse_flag, EnvironmentData};
