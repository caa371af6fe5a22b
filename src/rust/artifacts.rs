use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::config::{Config, MANIFEST_FILE};
use crate::pipeline::error::ArtifactError;
use crate::pipeline::{Classifier, RobustScaler};
#[cfg(feature = "onnx")]
use crate::runtime::RuntimeConfig;

/// `manifest.json`: expected SHA-256 digest per artifact file name.
#[derive(Debug, Deserialize)]
struct Manifest {
    files: BTreeMap<String, String>,
}

/// Locates and loads the fitted scaler and classifier.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    scaler_file: String,
    classifier_file: String,
    verify_manifest: bool,
    #[cfg(feature = "onnx")]
    runtime: RuntimeConfig,
}

impl ArtifactStore {
    /// Store over `dir` with the default file names.
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self::from_config(&Config::default().with_artifacts_dir(dir))
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            dir: config.artifacts_dir.clone(),
            scaler_file: config.scaler_file.clone(),
            classifier_file: config.classifier_file.clone(),
            verify_manifest: config.verify_manifest,
            #[cfg(feature = "onnx")]
            runtime: config.runtime.clone(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn scaler_path(&self) -> PathBuf {
        self.dir.join(&self.scaler_file)
    }

    pub fn classifier_path(&self) -> PathBuf {
        self.dir.join(&self.classifier_file)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    pub fn is_present(&self) -> bool {
        let scaler_path = self.scaler_path();
        let classifier_path = self.classifier_path();
        info!("Checking for artifacts:");
        info!("  Scaler path: {:?} (exists: {})", scaler_path, scaler_path.exists());
        info!("  Classifier path: {:?} (exists: {})", classifier_path, classifier_path.exists());
        scaler_path.exists() && classifier_path.exists()
    }

    /// Checks both artifacts against the manifest.
    ///
    /// `Ok(false)` when a file is absent or its digest differs; `Ok(true)`
    /// when everything listed matches or there is no manifest at all.
    pub fn verify(&self) -> Result<bool, ArtifactError> {
        if !self.is_present() {
            return Ok(false);
        }
        let Some(manifest) = self.read_manifest()? else {
            info!("No manifest at {:?}, skipping verification", self.manifest_path());
            return Ok(true);
        };

        for name in [&self.scaler_file, &self.classifier_file] {
            let bytes = fs::read(self.dir.join(name))?;
            match check_digest(&manifest, name, &bytes) {
                Ok(()) => {}
                Err(ArtifactError::HashMismatch { .. }) => return Ok(false),
                Err(e) => return Err(e),
            }
        }
        Ok(true)
    }

    /// Reads, verifies and decodes both artifacts.
    ///
    /// Either file being absent or unreadable is [`ArtifactError::Missing`].
    /// Nothing is retried.
    pub fn load(&self) -> Result<(RobustScaler, Classifier), ArtifactError> {
        let scaler_path = self.scaler_path();
        let classifier_path = self.classifier_path();
        info!("Loading artifacts from {:?}", self.dir);

        let scaler_bytes = read_artifact(&scaler_path)?;
        let classifier_bytes = read_artifact(&classifier_path)?;

        if self.verify_manifest {
            if let Some(manifest) = self.read_manifest()? {
                check_digest(&manifest, &self.scaler_file, &scaler_bytes)?;
                check_digest(&manifest, &self.classifier_file, &classifier_bytes)?;
                info!("Artifacts verified against {:?}", self.manifest_path());
            }
        }

        let scaler = RobustScaler::from_json(&scaler_bytes, &scaler_path)?;
        info!("Scaler loaded: {} features", scaler.n_features());

        let classifier = self.decode_classifier(&classifier_bytes, &classifier_path)?;
        info!(
            "Classifier loaded: {} model, {} features, classes {:?}",
            classifier.kind(),
            classifier.n_features(),
            classifier.classes()
        );

        Ok((scaler, classifier))
    }

    #[cfg(feature = "onnx")]
    fn decode_classifier(&self, bytes: &[u8], path: &Path) -> Result<Classifier, ArtifactError> {
        if is_onnx(path) {
            return crate::pipeline::onnx::OnnxModel::load(path, &self.runtime).map(Classifier::Onnx);
        }
        Classifier::from_json(bytes, path)
    }

    #[cfg(not(feature = "onnx"))]
    fn decode_classifier(&self, bytes: &[u8], path: &Path) -> Result<Classifier, ArtifactError> {
        if is_onnx(path) {
            return Err(ArtifactError::malformed(
                path,
                "ONNX classifiers need the `onnx` feature",
            ));
        }
        Classifier::from_json(bytes, path)
    }

    fn read_manifest(&self) -> Result<Option<Manifest>, ArtifactError> {
        let path = self.manifest_path();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ArtifactError::Io(e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| ArtifactError::malformed(&path, e.to_string()))
    }
}

fn is_onnx(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("onnx"))
}

fn read_artifact(path: &Path) -> Result<Vec<u8>, ArtifactError> {
    fs::read(path).map_err(|source| ArtifactError::Missing {
        path: path.to_path_buf(),
        source,
    })
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn check_digest(manifest: &Manifest, file_name: &str, bytes: &[u8]) -> Result<(), ArtifactError> {
    let Some(expected) = manifest.files.get(file_name) else {
        warn!("{} is not listed in the manifest", file_name);
        return Ok(());
    };
    let actual = sha256_hex(bytes);
    if !actual.eq_ignore_ascii_case(expected.trim()) {
        warn!("{} hash mismatch: expected {}, got {}", file_name, expected, actual);
        return Err(ArtifactError::HashMismatch {
            file_name: file_name.to_string(),
            expected: expected.clone(),
            actual,
        });
    }
    Ok(())
}
