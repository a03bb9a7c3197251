//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! the core use cases of the application.

mod auth;
mod inference;
mod registry;

pub use auth::AuthService;
pub use inference::InferenceService;
pub use registry::{Model, ModelRegistry, Registry};
