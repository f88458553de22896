//! Model directory loading: label encoders, classifier, and integrity manifest.
//!
//! A model directory holds:
//! - `label_encoders.json`: `{ column: [class, ...] }`, a class's code is its position
//! - `model.json`: the exported random forest (see `adapters::forest`)
//! - `manifest.json` (optional): SHA-256 digests binding both files
//!
//! Everything here runs once at startup. Any failure refuses startup: a table
//! that cannot encode what the form offers is a hard error.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::adapters::forest::RandomForestModel;
use crate::domain::{EncodingTable, LabelEncoder};

/// File name of the fitted label encoders.
pub const ENCODERS_FILE: &str = "label_encoders.json";

/// File name of the exported classifier.
pub const MODEL_FILE: &str = "model.json";

/// File name of the integrity manifest.
pub const MANIFEST_FILE: &str = "manifest.json";

const MANIFEST_VERSION: u32 = 1;

/// Error type for artifact loading.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid artifact format: {0}")]
    Parse(String),

    #[error("Artifact integrity check failed: {0}")]
    Integrity(String),

    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Invalid label encoder for column '{field}': {reason}")]
    InvalidEncoder { field: String, reason: String },

    #[error("Encoding table does not cover the form: {0}")]
    Coverage(String),
}

/// Digests of the files in a model directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub version: u32,
    pub files: BTreeMap<String, String>,
}

/// Everything the prediction service needs, loaded from one directory.
#[derive(Debug)]
pub struct ArtifactBundle {
    pub encoders: EncodingTable,
    pub model: RandomForestModel,
}

/// Lowercase hex SHA-256 of a byte slice.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, ArtifactError> {
    fs::read(path).map_err(|source| ArtifactError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Load the encoders and the classifier from `model_dir`.
///
/// # Arguments
/// * `model_dir` - Directory containing the artifact files
/// * `require_manifest` - Refuse to load when `manifest.json` is absent
///
/// # Errors
/// Returns error if any file is missing, malformed, fails its digest, or if
/// the encoders cannot encode every form option.
pub fn load_bundle(model_dir: &Path, require_manifest: bool) -> Result<ArtifactBundle, ArtifactError> {
    verify_manifest(model_dir, require_manifest)?;

    let encoders = load_encoding_table(&model_dir.join(ENCODERS_FILE))?;
    encoders
        .verify_form_coverage()
        .map_err(|errors| ArtifactError::Coverage(errors.join("; ")))?;

    let model = RandomForestModel::load(&model_dir.join(MODEL_FILE))?;

    Ok(ArtifactBundle { encoders, model })
}

/// Parse `label_encoders.json` into an encoding table.
///
/// # Errors
/// Returns error if the file is unreadable, not a `{ column: [class...] }`
/// object, or an encoder is not a bijection.
pub fn load_encoding_table(path: &Path) -> Result<EncodingTable, ArtifactError> {
    let bytes = read_bytes(path)?;
    let raw: BTreeMap<String, Vec<String>> = serde_json::from_slice(&bytes)
        .map_err(|e| ArtifactError::Parse(format!("{}: {e}", path.display())))?;

    let mut table = EncodingTable::new();
    for (field, classes) in raw {
        let encoder = LabelEncoder::from_classes(classes)
            .map_err(|reason| ArtifactError::InvalidEncoder {
                field: field.clone(),
                reason,
            })?;
        table.insert(field, encoder);
    }

    tracing::info!(
        "Loaded label encoders from {:?} (columns: {})",
        path,
        table.fields().collect::<Vec<_>>().join(", ")
    );

    Ok(table)
}

/// Check `manifest.json` against the files it binds.
///
/// Returns `Ok(None)` when there is no manifest and one is not required.
///
/// # Errors
/// Returns `ArtifactError::Integrity` on a missing required manifest, an
/// unsupported version, an unbound artifact, or a digest mismatch.
pub fn verify_manifest(
    model_dir: &Path,
    require_manifest: bool,
) -> Result<Option<ArtifactManifest>, ArtifactError> {
    let manifest_path = model_dir.join(MANIFEST_FILE);
    if !manifest_path.exists() {
        if require_manifest {
            tracing::error!("Manifest not found at {:?}", manifest_path);
            return Err(ArtifactError::Integrity(format!(
                "{MANIFEST_FILE} required but not found in {}",
                model_dir.display()
            )));
        }
        tracing::warn!(
            "No {} in {:?}; loading artifacts without integrity check",
            MANIFEST_FILE,
            model_dir
        );
        return Ok(None);
    }

    let content = read_bytes(&manifest_path)?;
    let manifest: ArtifactManifest = serde_json::from_slice(&content)
        .map_err(|e| ArtifactError::Parse(format!("{MANIFEST_FILE}: {e}")))?;

    if manifest.version != MANIFEST_VERSION {
        return Err(ArtifactError::Integrity(format!(
            "Unsupported manifest version: {}",
            manifest.version
        )));
    }

    for required in [ENCODERS_FILE, MODEL_FILE] {
        if !manifest.files.contains_key(required) {
            return Err(ArtifactError::Integrity(format!(
                "{MANIFEST_FILE} must include {required}"
            )));
        }
    }

    for (rel, expected_hex) in &manifest.files {
        let actual_hex = sha256_hex(&read_bytes(&model_dir.join(rel))?);
        if !actual_hex.eq_ignore_ascii_case(expected_hex.trim()) {
            return Err(ArtifactError::Integrity(format!(
                "File hash mismatch for {rel}"
            )));
        }
    }

    tracing::info!("Verified {} artifact digests", manifest.files.len());
    Ok(Some(manifest))
}

/// Build a manifest binding the artifacts currently in `model_dir`.
///
/// # Errors
/// Returns error if either artifact cannot be read.
pub fn build_manifest(model_dir: &Path) -> Result<ArtifactManifest, ArtifactError> {
    let mut files = BTreeMap::new();
    for rel in [ENCODERS_FILE, MODEL_FILE] {
        let bytes = read_bytes(&model_dir.join(rel))?;
        files.insert(rel.to_string(), sha256_hex(&bytes));
    }

    Ok(ArtifactManifest {
        version: MANIFEST_VERSION,
        files,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::adapters::forest::tests::demo_forest;
    use crate::domain::sample::form_options;
    use tempfile::tempdir;

    /// Write encoders fitted on the form options plus the demo forest.
    pub(crate) fn write_artifacts(dir: &Path) {
        let encoders: BTreeMap<String, Vec<String>> = form_options()
            .iter()
            .map(|(field, options)| {
                let mut classes: Vec<String> = options.iter().map(|s| s.to_string()).collect();
                classes.sort();
                (field.to_string(), classes)
            })
            .collect();
        fs::write(
            dir.join(ENCODERS_FILE),
            serde_json::to_vec_pretty(&encoders).expect("serialize encoders"),
        )
        .expect("write encoders");
        fs::write(
            dir.join(MODEL_FILE),
            serde_json::to_vec(&demo_forest()).expect("serialize model"),
        )
        .expect("write model");
    }

    fn write_manifest(dir: &Path) {
        let manifest = build_manifest(dir).expect("build manifest");
        fs::write(
            dir.join(MANIFEST_FILE),
            serde_json::to_vec_pretty(&manifest).expect("serialize manifest"),
        )
        .expect("write manifest");
    }

    #[test]
    fn test_load_bundle_without_manifest() {
        let temp = tempdir().expect("tempdir");
        write_artifacts(temp.path());

        let bundle = load_bundle(temp.path(), false).expect("Should load");
        assert_eq!(bundle.model.n_features(), 11);
        assert!(bundle.encoders.get("chainId").is_some());
    }

    #[test]
    fn test_missing_manifest_rejected_when_required() {
        let temp = tempdir().expect("tempdir");
        write_artifacts(temp.path());

        let err = load_bundle(temp.path(), true).expect_err("Should require manifest");
        assert!(matches!(err, ArtifactError::Integrity(_)));
    }

    #[test]
    fn test_manifest_verifies_digests() {
        let temp = tempdir().expect("tempdir");
        write_artifacts(temp.path());
        write_manifest(temp.path());

        let manifest = verify_manifest(temp.path(), true)
            .expect("Should verify")
            .expect("manifest present");
        assert_eq!(manifest.files.len(), 2);
        assert!(load_bundle(temp.path(), true).is_ok());

        // Tamper with the encoders after the manifest was written.
        let path = temp.path().join(ENCODERS_FILE);
        let mut content = fs::read_to_string(&path).expect("read encoders");
        content.push('\n');
        fs::write(&path, content).expect("rewrite encoders");

        let err = load_bundle(temp.path(), false).expect_err("Should detect tampering");
        assert!(err.to_string().contains("label_encoders.json"));
    }

    #[test]
    fn test_manifest_must_bind_both_artifacts() {
        let temp = tempdir().expect("tempdir");
        write_artifacts(temp.path());

        let mut manifest = build_manifest(temp.path()).expect("build manifest");
        manifest.files.remove(MODEL_FILE);
        fs::write(
            temp.path().join(MANIFEST_FILE),
            serde_json::to_vec(&manifest).expect("serialize"),
        )
        .expect("write manifest");

        assert!(matches!(
            verify_manifest(temp.path(), false),
            Err(ArtifactError::Integrity(_))
        ));
    }

    #[test]
    fn test_coverage_gap_refuses_startup() {
        let temp = tempdir().expect("tempdir");
        write_artifacts(temp.path());

        let encoders = serde_json::json!({
            "experimentalTechnique": ["X-RAY DIFFRACTION"],
            "macromoleculeType": ["DNA", "Protein", "Protein/DNA Hybrid", "RNA"],
            "crystallizationMethod": ["Batch", "Dialysis", "Free Interface Diffusion", "Lipidic Cubic Phase", "VAPOR DIFFUSION, HANGING DROP"],
            "chainId": ["A", "B", "C", "D", "E", "F", "G", "H"]
        });
        fs::write(
            temp.path().join(ENCODERS_FILE),
            serde_json::to_vec(&encoders).expect("serialize"),
        )
        .expect("write encoders");

        let err = load_bundle(temp.path(), false).expect_err("Should refuse");
        assert!(matches!(err, ArtifactError::Coverage(_)));
        assert!(err.to_string().contains("POWDER DIFFRACTION"));
    }

    #[test]
    fn test_duplicate_classes_rejected() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join(ENCODERS_FILE);
        fs::write(&path, r#"{"chainId": ["A", "A"]}"#).expect("write encoders");

        let err = load_encoding_table(&path).expect_err("Should reject");
        assert!(matches!(err, ArtifactError::InvalidEncoder { ref field, .. } if field == "chainId"));
    }

    #[test]
    fn test_missing_files_report_path() {
        let temp = tempdir().expect("tempdir");
        let err = load_bundle(temp.path(), false).expect_err("Should fail");
        assert!(matches!(err, ArtifactError::Read { .. }));
    }

    #[test]
    fn test_bundled_model_directory_verifies() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("models");
        let bundle = load_bundle(&dir, true).expect("Bundled artifacts should load");
        assert_eq!(bundle.model.classes(), &[0, 1, 2]);
        assert!(bundle.encoders.verify_form_coverage().is_ok());
    }
}
