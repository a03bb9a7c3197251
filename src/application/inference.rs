//! Inference service: Orchestrates sleep-disorder prediction.
//!
//! This service coordinates:
//! - Range validation of the raw request
//! - Category encoding into the fixed feature order
//! - Model selection and prediction
//! - Label decoding

use std::sync::Arc;

use crate::application::Registry;
use crate::domain::{PredictionRequest, PredictionResult, Session};
use crate::{Result, SleepInsightError};

/// Service for running predictions against the loaded registry.
///
/// Holds no per-request state. Identical requests to the same model always
/// produce identical results.
#[derive(Debug, Clone)]
pub struct InferenceService {
    registry: Arc<Registry>,
}

impl InferenceService {
    /// Create a new inference service.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Model names available for selection.
    #[must_use]
    pub fn list_models(&self) -> Vec<&str> {
        self.registry.models().list_models()
    }

    /// Run one prediction.
    ///
    /// Performs the full pipeline:
    /// 1. Validate numeric ranges
    /// 2. Encode categorical fields (fail fast on the first unknown value)
    /// 3. Predict with the named model
    /// 4. Decode the class code with the label encoder
    ///
    /// # Errors
    /// Returns `InvalidInput` or `UnknownCategory` for bad input,
    /// `ModelNotFound` for an unregistered model, and `FeatureMismatch` or
    /// `CodeOutOfRange` when the artifacts disagree with each other.
    pub fn predict(&self, request: &PredictionRequest, model_name: &str) -> Result<PredictionResult> {
        request.validate().map_err(SleepInsightError::InvalidInput)?;

        let model = self.registry.models().get(model_name)?;
        let encoders = self.registry.encoders();

        // Step 1: Encode
        let features = request.encode(encoders)?;
        tracing::debug!("Encoded {} features for {}", features.as_slice().len(), model_name);

        // Step 2: Predict
        let code = model.predict(&features).inspect_err(|e| {
            tracing::error!("Model {} rejected feature vector: {}", model_name, e);
        })?;

        // Step 3: Decode
        let label = encoders.labels()?.decode(code).map_err(|e| {
            tracing::error!("Model {} produced undecodable class {}", model_name, code);
            SleepInsightError::from(e)
        })?;

        tracing::info!("Prediction complete: model={}, label={}", model_name, label);
        Ok(PredictionResult::new(label, model_name))
    }

    /// Run a prediction on behalf of a logged-in session.
    ///
    /// # Errors
    /// Returns `NotAuthenticated` for an anonymous session, otherwise as
    /// [`InferenceService::predict`].
    pub fn predict_for(
        &self,
        session: &Session,
        request: &PredictionRequest,
        model_name: &str,
    ) -> Result<PredictionResult> {
        let username = session.require_user()?;
        tracing::debug!("Prediction requested by {}", username);
        self.predict(request, model_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SleepDisorder;

    fn create_test_service() -> InferenceService {
        let registry = Registry::load("models").expect("Bundled artifacts should load");
        InferenceService::new(Arc::new(registry))
    }

    fn scenario() -> PredictionRequest {
        PredictionRequest {
            gender: "Male".into(),
            age: 30,
            occupation: "Doctor".into(),
            sleep_duration: 7.0,
            quality_of_sleep: 7,
            physical_activity_level: 45,
            stress_level: 5,
            bmi_category: "Normal".into(),
            heart_rate: 72,
            daily_steps: 7500,
            systolic_bp: 120,
            diastolic_bp: 80,
        }
    }

    #[test]
    fn test_end_to_end_random_forest() {
        let service = create_test_service();
        let first = service.predict(&scenario(), "Random Forest").expect("predict");
        let second = service.predict(&scenario(), "Random Forest").expect("predict");

        assert_eq!(first, second);
        assert_eq!(first.model_name, "Random Forest");
        assert!(["Insomnia", "Sleep Apnea", "No Disorder"].contains(&first.label.as_str()));
        assert_eq!(first.disorder(), Some(SleepDisorder::NoDisorder));
    }

    #[test]
    fn test_every_model_is_deterministic() {
        let service = create_test_service();
        let names: Vec<String> = service.list_models().iter().map(|s| (*s).to_string()).collect();
        assert_eq!(names, ["Decision Tree", "Random Forest"]);

        for name in &names {
            let results: Vec<_> = (0..5)
                .map(|_| service.predict(&scenario(), name).expect("predict"))
                .collect();
            assert!(results.windows(2).all(|w| w[0] == w[1]));
        }
    }

    #[test]
    fn test_models_disagree_on_some_input() {
        let service = create_test_service();
        let request = PredictionRequest {
            bmi_category: "Overweight".into(),
            heart_rate: 70,
            stress_level: 5,
            daily_steps: 8000,
            diastolic_bp: 90,
            sleep_duration: 7.5,
            quality_of_sleep: 8,
            ..scenario()
        };
        let dt = service.predict(&request, "Decision Tree").expect("predict");
        let rf = service.predict(&request, "Random Forest").expect("predict");
        assert_eq!(dt.label, "Insomnia");
        assert_eq!(rf.label, "Sleep Apnea");
    }

    #[test]
    fn test_unknown_occupation() {
        let service = create_test_service();
        let request = PredictionRequest {
            occupation: "Astronaut".into(),
            ..scenario()
        };
        let err = service.predict(&request, "Random Forest").unwrap_err();
        assert!(matches!(
            &err,
            SleepInsightError::UnknownCategory { category, value }
                if category == "occupation" && value == "Astronaut"
        ));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_unknown_model() {
        let service = create_test_service();
        let err = service.predict(&scenario(), "Gradient Boosting").unwrap_err();
        assert!(matches!(err, SleepInsightError::ModelNotFound(_)));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_out_of_range_input() {
        let service = create_test_service();
        let request = PredictionRequest {
            age: 12,
            stress_level: 11,
            ..scenario()
        };
        match service.predict(&request, "Decision Tree") {
            Err(SleepInsightError::InvalidInput(problems)) => assert_eq!(problems.len(), 2),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_predict_for_requires_login() {
        let service = create_test_service();
        let session = Session::new();
        let err = service
            .predict_for(&session, &scenario(), "Random Forest")
            .unwrap_err();
        assert!(matches!(err, SleepInsightError::NotAuthenticated(_)));
    }
}
