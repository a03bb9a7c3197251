//! Adapters layer: Concrete implementations of ports.
//!
//! These modules contain the actual integration with external libraries:
//! - `sqlite`: SQLite credential store
//! - `tree`: decision-tree and random-forest classifiers
//! - `artifacts`: manifest-bound loading of models and encoders
//! - `sanitize`: PII filtering for logs

pub mod artifacts;
pub mod sanitize;
pub mod sqlite;
pub mod tree;

// Re-export adapter errors for lib.rs
pub use artifacts::ArtifactError;
pub use sqlite::StorageError;
