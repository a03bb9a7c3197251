//! Prediction request types for sleep-disorder classification.
//!
//! Fields follow the Sleep Health and Lifestyle dataset the models were
//! trained on.

use serde::{Deserialize, Serialize};

use super::encoding::{EncodingError, EncodingRegistry, BMI_CATEGORY, GENDER, OCCUPATION};

/// Number of features every model consumes.
pub const NUM_FEATURES: usize = 12;

/// Feature names in the order the trained models expect them.
pub const FEATURE_NAMES: [&str; NUM_FEATURES] = [
    "Gender",
    "Age",
    "Occupation",
    "Sleep Duration",
    "Quality of Sleep",
    "Physical Activity Level",
    "Stress Level",
    "BMI Category",
    "Heart Rate",
    "Daily Steps",
    "systolic_bp",
    "diastolic_bp",
];

/// Raw form input for one prediction.
///
/// Categorical fields are kept as the strings the user picked; they are
/// encoded against the trained vocabularies only when a feature vector is
/// assembled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    /// "Male" or "Female"
    pub gender: String,

    /// Age in years (18-100)
    pub age: u32,

    /// Occupation from the training vocabulary (e.g. "Doctor")
    pub occupation: String,

    /// Hours of sleep per day (3.0-12.0)
    pub sleep_duration: f64,

    /// Subjective sleep quality (1-10)
    pub quality_of_sleep: u32,

    /// Minutes of physical activity per day (0-180)
    pub physical_activity_level: u32,

    /// Subjective stress level (1-10)
    pub stress_level: u32,

    /// "Normal", "Overweight", "Obese", ...
    pub bmi_category: String,

    /// Resting heart rate in bpm (40-200)
    pub heart_rate: u32,

    /// Steps per day (1000-25000)
    pub daily_steps: u32,

    /// Systolic blood pressure in mmHg (90-200)
    pub systolic_bp: u32,

    /// Diastolic blood pressure in mmHg (50-120)
    pub diastolic_bp: u32,
}

impl Default for PredictionRequest {
    /// The defaults shown on the prediction form.
    fn default() -> Self {
        Self {
            gender: "Male".into(),
            age: 30,
            occupation: "Software Engineer".into(),
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
}

fn check_range(errors: &mut Vec<String>, label: &str, value: u32, min: u32, max: u32) {
    if !(min..=max).contains(&value) {
        errors.push(format!("{label} {value} out of range [{min}, {max}]"));
    }
}

impl PredictionRequest {
    /// Validate numeric fields against the ranges the input form allows.
    ///
    /// # Errors
    /// Returns every violation found, not just the first.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        check_range(&mut errors, "Age", self.age, 18, 100);
        if !self.sleep_duration.is_finite() || !(3.0..=12.0).contains(&self.sleep_duration) {
            errors.push(format!(
                "Sleep duration {} out of range [3, 12]",
                self.sleep_duration
            ));
        }
        check_range(&mut errors, "Quality of sleep", self.quality_of_sleep, 1, 10);
        check_range(
            &mut errors,
            "Physical activity",
            self.physical_activity_level,
            0,
            180,
        );
        check_range(&mut errors, "Stress level", self.stress_level, 1, 10);
        check_range(&mut errors, "Heart rate", self.heart_rate, 40, 200);
        check_range(&mut errors, "Daily steps", self.daily_steps, 1000, 25000);
        check_range(&mut errors, "Systolic BP", self.systolic_bp, 90, 200);
        check_range(&mut errors, "Diastolic BP", self.diastolic_bp, 50, 120);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Encode categorical fields and assemble the model feature vector.
    ///
    /// Fails on the first unknown category; nothing is partially encoded.
    ///
    /// # Errors
    /// Returns `UnknownCategory` or `MissingEncoder`.
    pub fn encode(&self, encoders: &EncodingRegistry) -> Result<FeatureVector, EncodingError> {
        let gender = encoders.encode(GENDER, &self.gender)?;
        let occupation = encoders.encode(OCCUPATION, &self.occupation)?;
        let bmi = encoders.encode(BMI_CATEGORY, &self.bmi_category)?;

        Ok(FeatureVector([
            f64::from(gender),
            f64::from(self.age),
            f64::from(occupation),
            self.sleep_duration,
            f64::from(self.quality_of_sleep),
            f64::from(self.physical_activity_level),
            f64::from(self.stress_level),
            f64::from(bmi),
            f64::from(self.heart_rate),
            f64::from(self.daily_steps),
            f64::from(self.systolic_bp),
            f64::from(self.diastolic_bp),
        ]))
    }
}

/// Encoded, fixed-order model input. Order matches [`FEATURE_NAMES`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f64; NUM_FEATURES]);

impl FeatureVector {
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Value of a named feature, if the name is known.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|idx| self.0[idx])
    }
}
