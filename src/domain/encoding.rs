//! Category encoders: bidirectional category <-> code mappings.
//!
//! Every encoder is built from the closed vocabulary seen at training time.
//! Codes are dense indices into that vocabulary, so `classes[code]` is the
//! inverse mapping.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Encoder for the `Gender` feature.
pub const GENDER: &str = "gender";
/// Encoder for the `Occupation` feature.
pub const OCCUPATION: &str = "occupation";
/// Encoder for the `BMI Category` feature.
pub const BMI_CATEGORY: &str = "bmi_category";
/// Label encoder for the model output.
pub const SLEEP_DISORDER: &str = "sleep_disorder";

/// Encoders every registry must provide.
pub const REQUIRED_ENCODERS: [&str; 4] = [GENDER, OCCUPATION, BMI_CATEGORY, SLEEP_DISORDER];

/// Errors raised by encoder construction and lookups.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    #[error("Unknown {category} value: {value:?}")]
    UnknownCategory { category: String, value: String },

    #[error("Code {code} is out of range for encoder {category}")]
    CodeOutOfRange { category: String, code: u32 },

    #[error("No encoder registered for {0}")]
    MissingEncoder(String),

    #[error("Encoder {category} is invalid: {reason}")]
    InvalidEncoder { category: String, reason: String },
}

/// Serialized form of a category encoder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderSpec {
    pub name: String,
    pub classes: Vec<String>,
}

/// A bijection between category strings and dense integer codes.
#[derive(Debug, Clone)]
pub struct CategoryEncoder {
    name: String,
    classes: Vec<String>,
    index: HashMap<String, u32>,
}

impl CategoryEncoder {
    /// Build an encoder from its trained vocabulary.
    ///
    /// # Errors
    /// Returns `InvalidEncoder` if the vocabulary is empty or has duplicates.
    pub fn new(name: impl Into<String>, classes: Vec<String>) -> Result<Self, EncodingError> {
        let name = name.into();
        if classes.is_empty() {
            return Err(EncodingError::InvalidEncoder {
                category: name,
                reason: "vocabulary is empty".into(),
            });
        }

        let mut index = HashMap::with_capacity(classes.len());
        for (code, class) in classes.iter().enumerate() {
            let code = u32::try_from(code).map_err(|_| EncodingError::InvalidEncoder {
                category: name.clone(),
                reason: "vocabulary too large".into(),
            })?;
            if index.insert(class.clone(), code).is_some() {
                return Err(EncodingError::InvalidEncoder {
                    category: name,
                    reason: format!("duplicate class {class:?}"),
                });
            }
        }

        Ok(Self {
            name,
            classes,
            index,
        })
    }

    /// Build an encoder from its serialized form.
    ///
    /// # Errors
    /// Same as [`CategoryEncoder::new`].
    pub fn from_spec(spec: EncoderSpec) -> Result<Self, EncodingError> {
        Self::new(spec.name, spec.classes)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The trained vocabulary, in code order.
    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Map a category value to its code.
    ///
    /// # Errors
    /// Returns `UnknownCategory` if `value` was not in the training vocabulary.
    pub fn encode(&self, value: &str) -> Result<u32, EncodingError> {
        self.index
            .get(value)
            .copied()
            .ok_or_else(|| EncodingError::UnknownCategory {
                category: self.name.clone(),
                value: value.to_string(),
            })
    }

    /// Map a code back to its category value.
    ///
    /// # Errors
    /// Returns `CodeOutOfRange` if the code was never assigned.
    pub fn decode(&self, code: u32) -> Result<&str, EncodingError> {
        self.classes
            .get(code as usize)
            .map(String::as_str)
            .ok_or_else(|| EncodingError::CodeOutOfRange {
                category: self.name.clone(),
                code,
            })
    }
}

/// The full set of encoders, keyed by category name. Read-only after load.
#[derive(Debug, Clone, Default)]
pub struct EncodingRegistry {
    encoders: BTreeMap<String, CategoryEncoder>,
}

impl EncodingRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an encoder, replacing any previous one with the same name.
    pub fn insert(&mut self, encoder: CategoryEncoder) {
        self.encoders.insert(encoder.name().to_string(), encoder);
    }

    /// Check that every encoder the orchestrator depends on is present.
    ///
    /// # Errors
    /// Returns `MissingEncoder` naming the first absent category.
    pub fn ensure_complete(&self) -> Result<(), EncodingError> {
        for name in REQUIRED_ENCODERS {
            if !self.encoders.contains_key(name) {
                return Err(EncodingError::MissingEncoder(name.to_string()));
            }
        }
        Ok(())
    }

    /// Look up an encoder by category name.
    ///
    /// # Errors
    /// Returns `MissingEncoder` if no encoder is registered under `category`.
    pub fn get(&self, category: &str) -> Result<&CategoryEncoder, EncodingError> {
        self.encoders
            .get(category)
            .ok_or_else(|| EncodingError::MissingEncoder(category.to_string()))
    }

    /// The label encoder for model output codes.
    ///
    /// # Errors
    /// Returns `MissingEncoder` if the registry has no label encoder.
    pub fn labels(&self) -> Result<&CategoryEncoder, EncodingError> {
        self.get(SLEEP_DISORDER)
    }

    /// # Errors
    /// `MissingEncoder` or `UnknownCategory`.
    pub fn encode(&self, category: &str, value: &str) -> Result<u32, EncodingError> {
        self.get(category)?.encode(value)
    }

    /// # Errors
    /// `MissingEncoder` or `CodeOutOfRange`.
    pub fn decode(&self, category: &str, code: u32) -> Result<&str, EncodingError> {
        self.get(category)?.decode(code)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CategoryEncoder> {
        self.encoders.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn occupations() -> CategoryEncoder {
        CategoryEncoder::new(
            OCCUPATION,
            ["Accountant", "Doctor", "Engineer", "Lawyer", "Nurse"]
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        )
        .expect("valid encoder")
    }

    #[test]
    fn test_encode_decode_roundtrip_over_vocabulary() {
        let enc = occupations();
        for class in enc.classes() {
            let code = enc.encode(class).expect("known class");
            assert_eq!(enc.decode(code).expect("known code"), class);
        }
    }

    #[test]
    fn test_codes_are_dense_indices() {
        let enc = occupations();
        assert_eq!(enc.encode("Accountant").unwrap(), 0);
        assert_eq!(enc.encode("Nurse").unwrap(), 4);
    }

    #[test]
    fn test_unknown_value_is_rejected() {
        let mut registry = EncodingRegistry::new();
        registry.insert(occupations());

        let err = registry.encode(OCCUPATION, "Astronaut").unwrap_err();
        assert_eq!(
            err,
            EncodingError::UnknownCategory {
                category: OCCUPATION.into(),
                value: "Astronaut".into(),
            }
        );
    }

    #[test]
    fn test_encode_is_case_sensitive() {
        assert!(occupations().encode("doctor").is_err());
    }

    #[test]
    fn test_decode_out_of_range() {
        let err = occupations().decode(5).unwrap_err();
        assert!(matches!(err, EncodingError::CodeOutOfRange { code: 5, .. }));
    }

    #[test]
    fn test_duplicate_classes_rejected() {
        let err = CategoryEncoder::new(GENDER, vec!["Male".into(), "Male".into()]).unwrap_err();
        assert!(matches!(err, EncodingError::InvalidEncoder { .. }));
    }

    #[test]
    fn test_empty_vocabulary_rejected() {
        assert!(CategoryEncoder::new(GENDER, Vec::new()).is_err());
    }

    #[test]
    fn test_registry_completeness() {
        let mut registry = EncodingRegistry::new();
        registry.insert(occupations());
        assert_eq!(
            registry.ensure_complete().unwrap_err(),
            EncodingError::MissingEncoder(GENDER.into())
        );
    }
}
