//! Domain layer: Core business types and logic.
//!
//! This module contains pure Rust types with no I/O.
//! Inputs are validated here before they reach storage or a model.

pub mod credential;
pub mod encoding;
mod model_info;
mod prediction;
mod request;
mod session;
mod user;

pub use encoding::{CategoryEncoder, EncoderSpec, EncodingError, EncodingRegistry};
pub use model_info::{ModelInfo, ModelMetrics};
pub use prediction::{PredictionResult, SleepDisorder, DISCLAIMER};
pub use request::{FeatureVector, PredictionRequest, FEATURE_NAMES, NUM_FEATURES};
pub use session::{NotAuthenticated, Page, Session};
pub use user::{RegistrationForm, User, TIMESTAMP_FORMAT};
