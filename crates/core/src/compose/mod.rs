//! `docker compose` lifecycle for the selected profile.

mod driver;

pub use driver::{ComposeDriver, ComposeError, ComposeProfile, ComposeStep, COMPOSE_PROFILES_ENV};
