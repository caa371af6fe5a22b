use std::io;
use std::path::PathBuf;

/// Failures raised while locating, verifying or decoding the fitted artifacts.
///
/// Every variant is fatal at startup: a process that cannot load its
/// artifacts must not accept prediction requests.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    /// The artifact file is absent or could not be read
    #[error("Artifact missing: {path:?} ({source})")]
    Missing {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The artifact was read but its contents are not a usable model
    #[error("Malformed artifact {path:?}: {reason}")]
    Malformed { path: PathBuf, reason: String },
    /// The manifest lists a digest that does not match the file on disk
    #[error("Hash mismatch: expected {expected}, got {actual} for {file_name}")]
    HashMismatch {
        file_name: String,
        expected: String,
        actual: String,
    },
    /// Scaler and classifier were fitted on different feature sets
    #[error("Incompatible artifacts: scaler expects {scaler_features} features, classifier expects {classifier_features}")]
    Incompatible {
        scaler_features: usize,
        classifier_features: usize,
    },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ArtifactError {
    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Represents the different types of errors that can occur while serving a prediction.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Artifacts could not be loaded
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    /// A required input field was not supplied
    #[error("Missing input field: {0}")]
    MissingField(&'static str),
    /// An input field name is not one of the recognised features
    #[error("Unrecognized input field: {0}")]
    UnknownField(String),
    /// A value lies outside the range accepted by the input surface
    #[error("Value {value} for {field} is outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    /// The vector width does not match what the scaler was fitted on
    #[error("Scaling error: scaler expects {expected} features, got {actual}")]
    Scaling { expected: usize, actual: usize },
    /// The classifier could not produce a class id
    #[error("Classification error: {0}")]
    Classification(String),
    /// The service refused the request because its artifacts never loaded
    #[error("Predictions unavailable: {0}")]
    Unavailable(String),
}
