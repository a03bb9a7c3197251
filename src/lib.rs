//! # SleepInsight
//!
//! Credential store and inference orchestrator for sleep-disorder screening.
//!
//! This crate provides:
//! - Registration and login backed by a salted-hash credential store
//! - Category encoders that map form inputs to trained model codes
//! - A registry of pre-trained tree classifiers
//! - An orchestrator that turns a raw request into a decoded prediction
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core business types (requests, encoders, users, sessions)
//! - `ports`: Trait definitions for external operations
//! - `adapters`: Concrete implementations (SQLite, JSON tree artifacts, log sanitizing)
//! - `application`: Use cases orchestrating domain and ports
//! - `config`: Environment-driven settings

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use application::{AuthService, InferenceService, Registry};
pub use domain::{PredictionRequest, PredictionResult, Session, SleepDisorder};

use adapters::{ArtifactError, StorageError};
use domain::{EncodingError, NotAuthenticated};

/// Result type for SleepInsight operations
pub type Result<T> = std::result::Result<T, SleepInsightError>;

/// Main error type for SleepInsight
#[derive(Debug, thiserror::Error)]
pub enum SleepInsightError {
    #[error("Username already exists: {0}")]
    DuplicateUser(String),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Unknown {category} value: {value:?}")]
    UnknownCategory { category: String, value: String },

    #[error("Invalid input: {}", .0.join("; "))]
    InvalidInput(Vec<String>),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    NotAuthenticated(#[from] NotAuthenticated),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Artifact not found: {0}")]
    ArtifactNotFound(std::path::PathBuf),

    #[error("Invalid artifact: {0}")]
    ArtifactInvalid(String),

    #[error("Model produced code {code} which encoder {category} cannot decode")]
    CodeOutOfRange { category: String, code: u32 },

    #[error("Feature vector has {actual} values, model expects {expected}")]
    FeatureMismatch { expected: usize, actual: usize },

    #[error("Credential store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Storage operation failed: {0}")]
    Storage(StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SleepInsightError {
    /// Whether the user can fix this by changing their input.
    ///
    /// Everything else is a deployment or infrastructure fault.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::DuplicateUser(_)
                | Self::InvalidCredentials
                | Self::UnknownCategory { .. }
                | Self::InvalidInput(_)
                | Self::Validation(_)
                | Self::NotAuthenticated(_)
        )
    }

    /// Whether retrying the same operation later may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

impl From<StorageError> for SleepInsightError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::DuplicateUser(username) => Self::DuplicateUser(username),
            StorageError::Unavailable(reason) => Self::StoreUnavailable(reason),
            other => Self::Storage(other),
        }
    }
}

impl From<EncodingError> for SleepInsightError {
    fn from(e: EncodingError) -> Self {
        match e {
            EncodingError::UnknownCategory { category, value } => {
                Self::UnknownCategory { category, value }
            }
            EncodingError::CodeOutOfRange { category, code } => {
                Self::CodeOutOfRange { category, code }
            }
            other => Self::ArtifactInvalid(other.to_string()),
        }
    }
}

impl From<ArtifactError> for SleepInsightError {
    fn from(e: ArtifactError) -> Self {
        match e {
            ArtifactError::NotFound(path) => Self::ArtifactNotFound(path),
            other => Self::ArtifactInvalid(other.to_string()),
        }
    }
}
