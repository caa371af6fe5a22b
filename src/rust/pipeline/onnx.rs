//! Classifiers exported to ONNX, run through ONNX Runtime.
//!
//! The graph is expected to take a single float32 input of shape
//! `[batch, n_features]` and to emit the predicted labels as an int64 tensor
//! in its first output, which is what common exporters produce for
//! tree ensembles and linear models.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use log::info;
use ndarray::Array2;
use ort::session::Session;
use ort::value::{Tensor, ValueType};

use super::error::{ArtifactError, PipelineError};
use super::features::FEATURE_COUNT;
use super::model::ClassId;
use super::scaler::ScaledVector;
use crate::runtime::{create_session_builder, RuntimeConfig};

#[derive(Debug)]
pub struct OnnxModel {
    session: Arc<Session>,
    input_name: String,
    n_features: usize,
}

impl OnnxModel {
    pub fn load(path: &Path, config: &RuntimeConfig) -> Result<Self, ArtifactError> {
        let builder = create_session_builder(config).map_err(|e| ArtifactError::malformed(path, e))?;
        let session = builder
            .commit_from_file(path)
            .map_err(|e| ArtifactError::malformed(path, format!("Failed to load ONNX model: {}", e)))?;

        let input = session
            .inputs
            .first()
            .ok_or_else(|| ArtifactError::malformed(path, "ONNX model has no inputs"))?;
        if session.outputs.is_empty() {
            return Err(ArtifactError::malformed(path, "ONNX model has no outputs"));
        }

        // Dynamic or missing widths fall back to the canonical feature count.
        let n_features = match &input.input_type {
            ValueType::Tensor { dimensions, .. } => dimensions
                .last()
                .and_then(|&d| usize::try_from(d).ok())
                .filter(|&d| d > 0)
                .unwrap_or(FEATURE_COUNT),
            _ => {
                return Err(ArtifactError::malformed(path, "ONNX model input is not a tensor"));
            }
        };
        let input_name = input.name.clone();
        info!("ONNX classifier loaded: input '{}' with {} features", input_name, n_features);

        Ok(Self {
            session: Arc::new(session),
            input_name,
            n_features,
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub(crate) fn predict(&self, x: &ScaledVector) -> Result<ClassId, PipelineError> {
        let values: Vec<f32> = x.values().iter().map(|&v| v as f32).collect();
        let input_array = Array2::from_shape_vec((1, values.len()), values)
            .map_err(|e| PipelineError::Classification(format!("Failed to create input array: {}", e)))?;
        let input_dyn = input_array.into_dyn();
        let input = input_dyn.as_standard_layout();

        let mut input_tensors = HashMap::new();
        input_tensors.insert(
            self.input_name.as_str(),
            Tensor::from_array(&input).map_err(|e| {
                PipelineError::Classification(format!("Failed to create input tensor: {}", e))
            })?,
        );

        let outputs = self
            .session
            .run(input_tensors)
            .map_err(|e| PipelineError::Classification(format!("Failed to run model: {}", e)))?;
        let labels = outputs[0].try_extract_tensor::<i64>().map_err(|e| {
            PipelineError::Classification(format!("Failed to extract label tensor: {}", e))
        })?;

        labels
            .iter()
            .next()
            .map(|&label| ClassId(label))
            .ok_or_else(|| PipelineError::Classification("model returned no label".into()))
    }
}
