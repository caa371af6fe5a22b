use std::env;
use std::path::{Path, PathBuf};

#[cfg(feature = "onnx")]
use crate::runtime::RuntimeConfig;

/// Environment variable overriding the default artifacts directory.
pub const HOME_ENV: &str = "AIROX_HOME";
pub const DEFAULT_SCALER_FILE: &str = "robust_scaler.json";
pub const DEFAULT_CLASSIFIER_FILE: &str = "classifier.json";
/// Optional SHA-256 manifest next to the artifacts.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Where the fitted artifacts live and how they are checked.
#[derive(Debug, Clone)]
pub struct Config {
    pub artifacts_dir: PathBuf,
    pub scaler_file: String,
    pub classifier_file: String,
    /// Check artifacts against `manifest.json` when one is present
    pub verify_manifest: bool,
    #[cfg(feature = "onnx")]
    pub runtime: RuntimeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            artifacts_dir: Self::default_artifacts_dir(),
            scaler_file: DEFAULT_SCALER_FILE.to_string(),
            classifier_file: DEFAULT_CLASSIFIER_FILE.to_string(),
            verify_manifest: true,
            #[cfg(feature = "onnx")]
            runtime: RuntimeConfig::default(),
        }
    }
}

/// Resolves the artifacts directory given the value of [`HOME_ENV`], if set.
fn artifacts_dir_from(home: Option<String>) -> PathBuf {
    // 1. Explicit home from the environment
    if let Some(path) = home {
        return PathBuf::from(path).join("artifacts");
    }

    // 2. Use platform-specific data directory
    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join("airox").join("artifacts");
    }

    // 3. Fallback to user's home directory
    if let Some(home_dir) = dirs::home_dir() {
        return home_dir.join(".airox").join("artifacts");
    }

    // 4. Last resort
    env::temp_dir().join("airox").join("artifacts")
}

impl Config {
    /// Returns the default artifacts directory path
    pub fn default_artifacts_dir() -> PathBuf {
        artifacts_dir_from(env::var(HOME_ENV).ok())
    }

    pub fn with_artifacts_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.artifacts_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_scaler_file(mut self, name: impl Into<String>) -> Self {
        self.scaler_file = name.into();
        self
    }

    pub fn with_classifier_file(mut self, name: impl Into<String>) -> Self {
        self.classifier_file = name.into();
        self
    }

    pub fn with_verify_manifest(mut self, verify: bool) -> Self {
        self.verify_manifest = verify;
        self
    }

    #[cfg(feature = "onnx")]
    pub fn with_runtime_config(mut self, runtime: RuntimeConfig) -> Self {
        self.runtime = runtime;
        self
    }
}
