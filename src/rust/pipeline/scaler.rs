use std::path::Path;

use log::debug;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

use super::error::{ArtifactError, PipelineError};
use super::features::{feature_names, FeatureVector};

/// Readings after robust scaling, still in fitting order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "Vec<f64>")]
pub struct ScaledVector(Array1<f64>);

impl ScaledVector {
    /// Wraps already-scaled values, e.g. to drive a classifier directly.
    pub fn from_raw(values: Vec<f64>) -> Self {
        Self(Array1::from_vec(values))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> &Array1<f64> {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.0.to_vec()
    }
}

impl From<ScaledVector> for Vec<f64> {
    fn from(vector: ScaledVector) -> Self {
        vector.0.to_vec()
    }
}

/// On-disk layout of a fitted robust scaler.
#[derive(Debug, Deserialize)]
struct ScalerDocument {
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    feature_names: Option<Vec<String>>,
    #[serde(default)]
    center: Option<Vec<f64>>,
    #[serde(default)]
    scale: Option<Vec<f64>>,
    #[serde(default = "enabled")]
    with_centering: bool,
    #[serde(default = "enabled")]
    with_scaling: bool,
}

fn enabled() -> bool {
    true
}

/// A fitted robust scaler: subtract the per-feature median, divide by the
/// per-feature interquartile range.
#[derive(Debug, Clone, PartialEq)]
pub struct RobustScaler {
    center: Array1<f64>,
    scale: Array1<f64>,
}

impl RobustScaler {
    /// Creates a scaler from fitted statistics.
    ///
    /// Zero scale entries (constant features at fit time) divide by one.
    pub fn new(center: Vec<f64>, scale: Vec<f64>) -> Result<Self, ArtifactError> {
        Self::validated(center, scale, Path::new("<memory>"))
    }

    /// Decodes a scaler artifact. `path` is only used in error messages.
    pub fn from_json(bytes: &[u8], path: &Path) -> Result<Self, ArtifactError> {
        let doc: ScalerDocument = serde_json::from_slice(bytes)
            .map_err(|e| ArtifactError::malformed(path, e.to_string()))?;

        if let Some(kind) = doc.kind.as_deref() {
            if kind != "robust_scaler" {
                return Err(ArtifactError::malformed(
                    path,
                    format!("expected a robust_scaler, found '{}'", kind),
                ));
            }
        }

        if let Some(names) = &doc.feature_names {
            let expected = feature_names();
            if names.len() != expected.len() || names.iter().zip(expected).any(|(a, b)| a != b) {
                return Err(ArtifactError::malformed(
                    path,
                    format!("feature order {:?} does not match {:?}", names, expected),
                ));
            }
        }

        let n_features = doc
            .center
            .as_ref()
            .or(doc.scale.as_ref())
            .map(Vec::len)
            .or_else(|| doc.feature_names.as_ref().map(Vec::len))
            .ok_or_else(|| {
                ArtifactError::malformed(path, "scaler has neither statistics nor feature names")
            })?;

        let center = match (doc.with_centering, doc.center) {
            (true, Some(center)) => center,
            (true, None) => {
                return Err(ArtifactError::malformed(path, "with_centering set but no center"))
            }
            (false, _) => vec![0.0; n_features],
        };
        let scale = match (doc.with_scaling, doc.scale) {
            (true, Some(scale)) => scale,
            (true, None) => {
                return Err(ArtifactError::malformed(path, "with_scaling set but no scale"))
            }
            (false, _) => vec![1.0; n_features],
        };

        Self::validated(center, scale, path)
    }

    fn validated(center: Vec<f64>, scale: Vec<f64>, path: &Path) -> Result<Self, ArtifactError> {
        if center.len() != scale.len() {
            return Err(ArtifactError::malformed(
                path,
                format!("center has {} entries, scale has {}", center.len(), scale.len()),
            ));
        }
        if center.is_empty() {
            return Err(ArtifactError::malformed(path, "scaler has no features"));
        }
        if center.iter().chain(&scale).any(|v| !v.is_finite()) {
            return Err(ArtifactError::malformed(path, "scaler statistics must be finite"));
        }

        let scale = scale
            .into_iter()
            .map(|s| if s == 0.0 { 1.0 } else { s })
            .collect::<Array1<f64>>();

        Ok(Self {
            center: Array1::from_vec(center),
            scale,
        })
    }

    /// Number of features the scaler was fitted on.
    pub fn n_features(&self) -> usize {
        self.center.len()
    }

    /// Scales `vector` elementwise.
    ///
    /// A width mismatch means the builder and the artifact disagree; the
    /// request is aborted without producing a partial result.
    pub fn transform(&self, vector: &FeatureVector) -> Result<ScaledVector, PipelineError> {
        if vector.len() != self.n_features() {
            return Err(PipelineError::Scaling {
                expected: self.n_features(),
                actual: vector.len(),
            });
        }

        let scaled = (vector.values() - &self.center) / &self.scale;
        debug!("Scaled vector: {:?}", scaled);
        Ok(ScaledVector(scaled))
    }
}
