//! Model and encoder registry.
//!
//! Built once at startup from an artifact directory and then shared
//! read-only (`Arc<Registry>`) by every request handler.

use std::path::Path;

use crate::adapters::artifacts::{ArtifactBundle, ArtifactLoader, LoadedModel};
use crate::domain::{EncodingRegistry, FeatureVector, ModelInfo, FEATURE_NAMES};
use crate::ports::Classifier;
use crate::{Result, SleepInsightError};

/// A named, trained classifier.
#[derive(Debug)]
pub struct Model {
    info: ModelInfo,
    feature_names: Vec<String>,
    classifier: Box<dyn Classifier>,
}

impl Model {
    /// Wrap a classifier, checking that it consumes the orchestrator's
    /// feature order.
    ///
    /// # Errors
    /// Returns `ArtifactInvalid` if the declared features differ from
    /// [`FEATURE_NAMES`].
    pub fn new(
        info: ModelInfo,
        feature_names: Vec<String>,
        classifier: Box<dyn Classifier>,
    ) -> Result<Self> {
        if feature_names.len() != FEATURE_NAMES.len()
            || feature_names.iter().zip(FEATURE_NAMES).any(|(a, b)| a != b)
        {
            return Err(SleepInsightError::ArtifactInvalid(format!(
                "model {:?} declares features {:?}, expected {:?}",
                info.name, feature_names, FEATURE_NAMES
            )));
        }
        if classifier.n_features() != feature_names.len() {
            return Err(SleepInsightError::ArtifactInvalid(format!(
                "model {:?} was built for {} features but declares {}",
                info.name,
                classifier.n_features(),
                feature_names.len()
            )));
        }

        Ok(Self {
            info,
            feature_names,
            classifier,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.info.name
    }

    #[must_use]
    pub fn info(&self) -> &ModelInfo {
        &self.info
    }

    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub(crate) fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    /// Predict a class code.
    ///
    /// # Errors
    /// Returns `FeatureMismatch` if the vector length is not what the model
    /// was trained on. The classifier is never called in that case.
    pub fn predict(&self, features: &FeatureVector) -> Result<u32> {
        let expected = self.classifier.n_features();
        let values = features.as_slice();
        if values.len() != expected {
            return Err(SleepInsightError::FeatureMismatch {
                expected,
                actual: values.len(),
            });
        }
        Ok(self.classifier.predict(values))
    }
}

/// Models in display order.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: Vec<Model>,
}

impl ModelRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    /// Returns `ArtifactInvalid` if a model with the same name exists.
    pub fn register(&mut self, model: Model) -> Result<()> {
        if self.models.iter().any(|m| m.name() == model.name()) {
            return Err(SleepInsightError::ArtifactInvalid(format!(
                "duplicate model name {:?}",
                model.name()
            )));
        }
        self.models.push(model);
        Ok(())
    }

    /// Model names, for selection in the UI.
    #[must_use]
    pub fn list_models(&self) -> Vec<&str> {
        self.models.iter().map(Model::name).collect()
    }

    pub fn models(&self) -> impl Iterator<Item = &Model> {
        self.models.iter()
    }

    /// # Errors
    /// Returns `ModelNotFound` for an unregistered name.
    pub fn get(&self, name: &str) -> Result<&Model> {
        self.models
            .iter()
            .find(|m| m.name() == name)
            .ok_or_else(|| SleepInsightError::ModelNotFound(name.to_string()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// Encoders plus models, checked for consistency with each other.
#[derive(Debug)]
pub struct Registry {
    encoders: EncodingRegistry,
    models: ModelRegistry,
}

impl Registry {
    /// Assemble a registry, verifying that every class code any model can
    /// emit is decodable by the label encoder.
    ///
    /// # Errors
    /// Returns `ArtifactInvalid` for missing encoders, an empty model set or a
    /// model/label-encoder mismatch.
    pub fn new(encoders: EncodingRegistry, models: ModelRegistry) -> Result<Self> {
        encoders.ensure_complete()?;
        if models.is_empty() {
            return Err(SleepInsightError::ArtifactInvalid(
                "no models registered".into(),
            ));
        }

        let labels = encoders.labels()?;
        for model in models.models() {
            for code in model.classifier().output_codes() {
                if labels.decode(code).is_err() {
                    return Err(SleepInsightError::ArtifactInvalid(format!(
                        "model {:?} can emit class {code} but the label encoder has {} classes",
                        model.name(),
                        labels.len()
                    )));
                }
            }
        }

        Ok(Self { encoders, models })
    }

    /// Load and check everything in an artifact directory.
    ///
    /// # Errors
    /// Returns `ArtifactNotFound` for missing files and `ArtifactInvalid` for
    /// anything malformed or inconsistent.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        tracing::info!("Loading artifacts from {:?}", dir);

        let ArtifactBundle { encoders, models } = ArtifactLoader::new(dir)?.load()?;

        let mut registry = ModelRegistry::new();
        for LoadedModel {
            info,
            feature_names,
            classifier,
        } in models
        {
            registry.register(Model::new(info, feature_names, classifier)?)?;
        }

        let registry = Self::new(encoders, registry)?;
        tracing::info!(
            "Registry ready: {} models, {} encoders",
            registry.models.len(),
            registry.encoders.iter().count()
        );
        Ok(registry)
    }

    #[must_use]
    pub fn encoders(&self) -> &EncodingRegistry {
        &self.encoders
    }

    #[must_use]
    pub fn models(&self) -> &ModelRegistry {
        &self.models
    }
}
