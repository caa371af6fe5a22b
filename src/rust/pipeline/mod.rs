//! Inference pipeline: build, scale, classify, resolve.

pub mod context;
pub mod error;
pub mod features;
pub mod labels;
pub mod model;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod scaler;
mod utils;

pub use context::{ContextInfo, Prediction, PredictionContext, PredictionService, Stage};
pub use error::{ArtifactError, PipelineError};
pub use features::{build, feature_names, Feature, FeatureVector, FEATURE_COUNT};
pub use labels::{resolve, QualityLabel};
pub use model::{ClassId, Classifier, DecisionTree, ForestModel, LinearModel, TreeDocument};
pub use scaler::{RobustScaler, ScaledVector};

/// Scales `vector` with a fitted scaler.
pub fn scale(scaler: &RobustScaler, vector: &FeatureVector) -> Result<ScaledVector, PipelineError> {
    scaler.transform(vector)
}

/// Classifies a scaled vector.
pub fn classify(classifier: &Classifier, vector: &ScaledVector) -> Result<ClassId, PipelineError> {
    classifier.predict(vector)
}
