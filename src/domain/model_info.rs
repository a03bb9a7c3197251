//! Descriptive metadata shipped with each trained model.

use serde::{Deserialize, Serialize};

/// Display metadata and held-out scores for one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Registry key and display name (e.g. "Random Forest")
    pub name: String,

    #[serde(default)]
    pub summary: String,

    #[serde(default)]
    pub strengths: String,

    #[serde(default)]
    pub best_for: String,

    /// Held-out scores in [0, 1]
    #[serde(default)]
    pub metrics: Option<ModelMetrics>,
}

/// Classification scores measured on the held-out split.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl ModelInfo {
    /// Bare metadata with only a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            summary: String::new(),
            strengths: String::new(),
            best_for: String::new(),
            metrics: None,
        }
    }
}
