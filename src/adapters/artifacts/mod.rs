//! Artifact adapter: Loads trained models and encoders from disk.
//!
//! The artifact directory holds a `manifest.json` naming every model and
//! encoder file. If the manifest lists a SHA-256 digest for a file, the
//! file's contents must match it before anything is parsed.
//!
//! # Layout
//!
//! ```text
//! models/
//!   manifest.json
//!   decision_tree.json
//!   random_forest.json
//!   encoders/gender.json ...
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::adapters::tree::ModelArtifact;
use crate::domain::{CategoryEncoder, EncoderSpec, EncodingRegistry, ModelInfo, ModelMetrics};
use crate::ports::Classifier;

/// Name of the manifest inside the artifact directory.
pub const MANIFEST_FILE: &str = "manifest.json";

const SUPPORTED_MANIFEST_VERSION: u32 = 1;

/// Errors raised while loading artifacts.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Artifact not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid artifact {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },

    #[error("Failed to read artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ArtifactError {
    fn invalid(path: &Path, reason: impl Into<String>) -> Self {
        Self::Invalid {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

/// One model entry in the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelEntry {
    pub name: String,
    pub file: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub strengths: String,
    #[serde(default)]
    pub best_for: String,
    #[serde(default)]
    pub metrics: Option<ModelMetrics>,
}

impl ModelEntry {
    fn info(&self) -> ModelInfo {
        ModelInfo {
            name: self.name.clone(),
            summary: self.summary.clone(),
            strengths: self.strengths.clone(),
            best_for: self.best_for.clone(),
            metrics: self.metrics,
        }
    }
}

/// Parsed `manifest.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub version: u32,
    /// Models in display order
    pub models: Vec<ModelEntry>,
    /// Category name -> encoder file
    pub encoders: BTreeMap<String, String>,
    /// Relative path -> expected SHA-256 (hex)
    #[serde(default)]
    pub files: BTreeMap<String, String>,
}

/// A model parsed from disk, not yet checked against the encoders.
#[derive(Debug)]
pub struct LoadedModel {
    pub info: ModelInfo,
    pub feature_names: Vec<String>,
    pub classifier: Box<dyn Classifier>,
}

/// Everything read from an artifact directory.
#[derive(Debug)]
pub struct ArtifactBundle {
    pub encoders: EncodingRegistry,
    pub models: Vec<LoadedModel>,
}

/// Reads artifacts from a directory.
#[derive(Debug, Clone)]
pub struct ArtifactLoader {
    base_dir: PathBuf,
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn constant_time_eq_str(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes().iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

impl ArtifactLoader {
    /// # Errors
    /// Returns `NotFound` if `base_dir` is not an existing directory.
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self, ArtifactError> {
        let base_dir = base_dir.into();
        if !base_dir.is_dir() {
            return Err(ArtifactError::NotFound(base_dir));
        }
        Ok(Self { base_dir })
    }

    /// Load the manifest, every encoder and every model.
    ///
    /// # Errors
    /// Returns the first missing, unreadable, tampered or malformed artifact.
    pub fn load(&self) -> Result<ArtifactBundle, ArtifactError> {
        let manifest = self.read_manifest()?;

        let mut encoders = EncodingRegistry::new();
        for (category, rel) in &manifest.encoders {
            let (path, bytes) = self.read_bound(&manifest, rel)?;
            let spec: EncoderSpec = serde_json::from_slice(&bytes)
                .map_err(|e| ArtifactError::invalid(&path, e.to_string()))?;
            if &spec.name != category {
                return Err(ArtifactError::invalid(
                    &path,
                    format!("encoder is named {:?}, manifest expects {category:?}", spec.name),
                ));
            }
            let encoder = CategoryEncoder::from_spec(spec)
                .map_err(|e| ArtifactError::invalid(&path, e.to_string()))?;
            tracing::debug!("Loaded encoder {} ({} classes)", category, encoder.len());
            encoders.insert(encoder);
        }

        let mut models = Vec::with_capacity(manifest.models.len());
        for entry in &manifest.models {
            let (path, bytes) = self.read_bound(&manifest, &entry.file)?;
            let artifact: ModelArtifact = serde_json::from_slice(&bytes)
                .map_err(|e| ArtifactError::invalid(&path, e.to_string()))?;
            let feature_names = artifact.feature_names().to_vec();
            let classifier = artifact
                .into_classifier()
                .map_err(|reason| ArtifactError::invalid(&path, reason))?;

            tracing::info!(
                "Loaded model {:?} from {:?} (n_features={})",
                entry.name,
                path,
                classifier.n_features()
            );

            models.push(LoadedModel {
                info: entry.info(),
                feature_names,
                classifier,
            });
        }

        Ok(ArtifactBundle { encoders, models })
    }

    fn read_manifest(&self) -> Result<ArtifactManifest, ArtifactError> {
        let path = self.base_dir.join(MANIFEST_FILE);
        let bytes = read_file(&path)?;
        let manifest: ArtifactManifest = serde_json::from_slice(&bytes)
            .map_err(|e| ArtifactError::invalid(&path, format!("invalid manifest: {e}")))?;

        if manifest.version != SUPPORTED_MANIFEST_VERSION {
            return Err(ArtifactError::invalid(
                &path,
                format!("unsupported manifest version {}", manifest.version),
            ));
        }
        if manifest.models.is_empty() {
            return Err(ArtifactError::invalid(&path, "manifest lists no models"));
        }
        Ok(manifest)
    }

    /// Resolve a manifest-relative path, refusing anything that escapes the
    /// artifact directory.
    fn resolve(&self, rel: &str) -> Result<PathBuf, ArtifactError> {
        let rel_path = Path::new(rel);
        let escapes = rel_path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if rel.is_empty() || escapes {
            return Err(ArtifactError::invalid(
                &self.base_dir.join(MANIFEST_FILE),
                format!("path {rel:?} must stay inside the artifact directory"),
            ));
        }
        Ok(self.base_dir.join(rel_path))
    }

    /// Read a manifest-referenced file, checking its digest when one is listed.
    fn read_bound(
        &self,
        manifest: &ArtifactManifest,
        rel: &str,
    ) -> Result<(PathBuf, Vec<u8>), ArtifactError> {
        let path = self.resolve(rel)?;
        let bytes = read_file(&path)?;

        if let Some(expected) = manifest.files.get(rel) {
            let actual = sha256_hex(&bytes);
            if !constant_time_eq_str(&actual, &expected.to_ascii_lowercase()) {
                return Err(ArtifactError::invalid(&path, "file hash mismatch"));
            }
        } else {
            tracing::debug!("No digest listed for {rel}; loading unchecked");
        }

        Ok((path, bytes))
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, ArtifactError> {
    fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ArtifactError::NotFound(path.to_path_buf())
        } else {
            ArtifactError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const TREE_JSON: &str = r#"{
        "kind": "decision_tree",
        "feature_names": ["x"],
        "tree": {"split": {"feature": 0, "threshold": 0.5,
                 "left": {"leaf": {"class": 0}}, "right": {"leaf": {"class": 1}}}}
    }"#;

    const LABELS_JSON: &str = r#"{"name": "sleep_disorder", "classes": ["Insomnia", "No Disorder"]}"#;

    fn write_manifest(dir: &Path, files: &[(&str, String)]) {
        let manifest = ArtifactManifest {
            version: 1,
            models: vec![ModelEntry {
                name: "Tiny Tree".into(),
                file: "tree.json".into(),
                summary: String::new(),
                strengths: String::new(),
                best_for: String::new(),
                metrics: None,
            }],
            encoders: BTreeMap::from([("sleep_disorder".to_string(), "labels.json".to_string())]),
            files: files
                .iter()
                .map(|(rel, digest)| ((*rel).to_string(), digest.clone()))
                .collect(),
        };
        let json = serde_json::to_vec_pretty(&manifest).expect("serialize manifest");
        fs::write(dir.join(MANIFEST_FILE), json).expect("write manifest");
    }

    fn write_artifacts(dir: &Path) {
        fs::write(dir.join("tree.json"), TREE_JSON).expect("write tree");
        fs::write(dir.join("labels.json"), LABELS_JSON).expect("write labels");
    }

    #[test]
    fn test_load_with_digests() {
        let temp = tempdir().expect("tempdir");
        let dir = temp.path();
        write_artifacts(dir);
        write_manifest(
            dir,
            &[
                ("tree.json", sha256_hex(TREE_JSON.as_bytes())),
                ("labels.json", sha256_hex(LABELS_JSON.as_bytes())),
            ],
        );

        let bundle = ArtifactLoader::new(dir).expect("dir").load().expect("load");
        assert_eq!(bundle.models.len(), 1);
        assert_eq!(bundle.models[0].info.name, "Tiny Tree");
        assert_eq!(bundle.models[0].classifier.predict(&[1.0]), 1);
        assert_eq!(bundle.encoders.decode("sleep_disorder", 1).expect("decode"), "No Disorder");
    }

    #[test]
    fn test_tampered_file_rejected() {
        let temp = tempdir().expect("tempdir");
        let dir = temp.path();
        write_artifacts(dir);
        write_manifest(dir, &[("tree.json", sha256_hex(b"something else"))]);

        let err = ArtifactLoader::new(dir).expect("dir").load().unwrap_err();
        assert!(err.to_string().contains("hash mismatch"));
    }

    #[test]
    fn test_missing_model_file_is_not_found() {
        let temp = tempdir().expect("tempdir");
        let dir = temp.path();
        fs::write(dir.join("labels.json"), LABELS_JSON).expect("write labels");
        write_manifest(dir, &[]);

        let err = ArtifactLoader::new(dir).expect("dir").load().unwrap_err();
        assert!(matches!(err, ArtifactError::NotFound(p) if p.ends_with("tree.json")));
    }

    #[test]
    fn test_missing_directory_is_not_found() {
        let temp = tempdir().expect("tempdir");
        let err = ArtifactLoader::new(temp.path().join("nope")).unwrap_err();
        assert!(matches!(err, ArtifactError::NotFound(_)));
    }

    #[test]
    fn test_path_escape_rejected() {
        let temp = tempdir().expect("tempdir");
        let loader = ArtifactLoader::new(temp.path()).expect("dir");
        assert!(loader.resolve("../etc/passwd").is_err());
        assert!(loader.resolve("/etc/passwd").is_err());
        assert!(loader.resolve("encoders/gender.json").is_ok());
    }

    #[test]
    fn test_encoder_name_must_match_manifest_key() {
        let temp = tempdir().expect("tempdir");
        let dir = temp.path();
        fs::write(dir.join("tree.json"), TREE_JSON).expect("write tree");
        fs::write(dir.join("labels.json"), r#"{"name": "gender", "classes": ["F", "M"]}"#)
            .expect("write labels");
        write_manifest(dir, &[]);

        let err = ArtifactLoader::new(dir).expect("dir").load().unwrap_err();
        assert!(matches!(err, ArtifactError::Invalid { .. }));
    }

    #[test]
    fn test_bundled_models_directory_loads() {
        let bundle = ArtifactLoader::new("models").expect("dir").load().expect("load");
        let names: Vec<_> = bundle.models.iter().map(|m| m.info.name.as_str()).collect();
        assert_eq!(names, ["Decision Tree", "Random Forest"]);
        assert!(bundle.encoders.ensure_complete().is_ok());
    }
}
