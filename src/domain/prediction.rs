//! Prediction result types.
//!
//! Represents the decoded output of a sleep-disorder classifier.

use serde::{Deserialize, Serialize};

/// Shown alongside every prediction.
pub const DISCLAIMER: &str = "This prediction is based on machine learning algorithms and \
should not be considered a medical diagnosis. Please consult with a healthcare professional \
for proper evaluation and diagnosis of sleep disorders.";

/// Sleep-disorder classes the label encoder can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SleepDisorder {
    Insomnia,
    SleepApnea,
    NoDisorder,
}

impl SleepDisorder {
    /// Parse a decoded label.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Insomnia" => Some(Self::Insomnia),
            "Sleep Apnea" => Some(Self::SleepApnea),
            "No Disorder" | "None" => Some(Self::NoDisorder),
            _ => None,
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Insomnia => "Insomnia",
            Self::SleepApnea => "Sleep Apnea",
            Self::NoDisorder => "No Disorder",
        }
    }

    /// Get a human-readable description.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Insomnia => {
                "Difficulty falling asleep, staying asleep, or both, despite adequate \
                 opportunity for sleep"
            }
            Self::SleepApnea => {
                "Breathing repeatedly stops and starts during sleep; a potentially \
                 serious disorder"
            }
            Self::NoDisorder => "Your input suggests you likely don't have a sleep disorder",
        }
    }

    /// Suggested follow-up for this result.
    #[must_use]
    pub fn next_steps(&self) -> &'static str {
        match self {
            Self::Insomnia => {
                "Consider consulting with a healthcare provider. Lifestyle changes, better \
                 sleep hygiene, cognitive behavioral therapy, and in some cases medication \
                 can help manage insomnia."
            }
            Self::SleepApnea => {
                "Sleep apnea requires medical attention. Consider consulting with a sleep \
                 specialist for proper diagnosis and treatment options."
            }
            Self::NoDisorder => {
                "Continue your healthy habits. If you experience changes in your sleep \
                 pattern, consider reassessing."
            }
        }
    }

    /// Get the associated display color (RGB).
    #[must_use]
    pub fn color(&self) -> (u8, u8, u8) {
        match self {
            Self::Insomnia => (255, 165, 0),  // orange
            Self::SleepApnea => (220, 38, 38), // red
            Self::NoDisorder => (16, 185, 129), // green
        }
    }
}

impl std::fmt::Display for SleepDisorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of one prediction request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Decoded label, as produced by the label encoder
    pub label: String,

    /// Name of the model that produced it
    pub model_name: String,
}

impl PredictionResult {
    #[must_use]
    pub fn new(label: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            model_name: model_name.into(),
        }
    }

    /// Interpret the label, if it is one of the known disorder classes.
    #[must_use]
    pub fn disorder(&self) -> Option<SleepDisorder> {
        SleepDisorder::from_label(&self.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_roundtrip() {
        for disorder in [
            SleepDisorder::Insomnia,
            SleepDisorder::SleepApnea,
            SleepDisorder::NoDisorder,
        ] {
            assert_eq!(SleepDisorder::from_label(disorder.label()), Some(disorder));
        }
    }

    #[test]
    fn test_display_colors() {
        assert_eq!(SleepDisorder::Insomnia.color(), (255, 165, 0));
        assert_eq!(SleepDisorder::SleepApnea.color(), (220, 38, 38));
        assert_eq!(SleepDisorder::NoDisorder.color(), (16, 185, 129));
    }

    #[test]
    fn test_dataset_none_label_means_no_disorder() {
        assert_eq!(SleepDisorder::from_label("None"), Some(SleepDisorder::NoDisorder));
    }

    #[test]
    fn test_result_interpretation() {
        let result = PredictionResult::new("Sleep Apnea", "Random Forest");
        assert_eq!(result.disorder(), Some(SleepDisorder::SleepApnea));
        assert_eq!(result.to_owned().model_name, "Random Forest");

        let unknown = PredictionResult::new("Narcolepsy", "Decision Tree");
        assert!(unknown.disorder().is_none());
    }
}
