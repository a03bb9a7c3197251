//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the application and external systems (storage, model artifacts).

mod classifier;
mod credential_store;

pub use classifier::Classifier;
pub use credential_store::CredentialStore;
