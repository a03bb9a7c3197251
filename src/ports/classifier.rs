//! Classifier port: Trait for trained model artifacts.
//!
//! The orchestrator only depends on this trait; how a model is serialized
//! or evaluated is the adapter's concern.

use std::collections::BTreeSet;

/// A trained multi-class classifier.
///
/// Implementations are immutable after load and hold no per-call state, so
/// the same input always yields the same class code.
pub trait Classifier: Send + Sync + std::fmt::Debug {
    /// Number of features the model was trained on.
    fn n_features(&self) -> usize;

    /// Every class code the model can emit.
    fn output_codes(&self) -> BTreeSet<u32>;

    /// Predict the class code for one sample.
    ///
    /// `features.len()` must equal [`Classifier::n_features`]; callers check
    /// this before invoking the model.
    fn predict(&self, features: &[f64]) -> u32;
}
