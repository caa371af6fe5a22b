use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, error, info, warn};
use serde::Serialize;

use super::error::{ArtifactError, PipelineError};
use super::features::{self, FeatureVector};
use super::labels::{self, QualityLabel};
use super::model::{ClassId, Classifier};
use super::scaler::{RobustScaler, ScaledVector};
use crate::artifacts::ArtifactStore;

/// Progress of a single prediction request.
///
/// Stages run strictly in order; a failure jumps to `Failed` and skips the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Building,
    Scaling,
    Classifying,
    Resolving,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Building => "building",
            Self::Scaling => "scaling",
            Self::Classifying => "classifying",
            Self::Resolving => "resolving",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

struct Request {
    stage: Stage,
}

impl Request {
    fn new() -> Self {
        Self { stage: Stage::Idle }
    }

    fn advance(&mut self, next: Stage) {
        debug!("Prediction {} -> {}", self.stage, next);
        self.stage = next;
    }

    fn finish<T>(&mut self, result: Result<T, PipelineError>) -> Result<T, PipelineError> {
        match &result {
            Ok(_) => self.advance(Stage::Done),
            Err(e) => {
                warn!("Prediction failed while {}: {}", self.stage, e);
                self.stage = Stage::Failed;
            }
        }
        result
    }
}

/// Outcome of one prediction request.
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub features: FeatureVector,
    pub scaled: ScaledVector,
    pub class_id: ClassId,
    pub label: QualityLabel,
}

/// Description of the loaded artifacts.
#[derive(Debug, Clone, Serialize)]
pub struct ContextInfo {
    pub classifier_kind: &'static str,
    pub classes: Vec<i64>,
    pub unmapped_classes: Vec<i64>,
    pub n_features: usize,
    pub scaler_path: Option<PathBuf>,
    pub classifier_path: Option<PathBuf>,
}

/// Immutable artifacts shared by every request.
///
/// Built once at startup; cloning only bumps reference counts, so request
/// handlers on any thread can hold their own copy.
#[derive(Debug, Clone)]
pub struct PredictionContext {
    scaler: Arc<RobustScaler>,
    classifier: Arc<Classifier>,
    paths: Option<(PathBuf, PathBuf)>,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<PredictionContext>();
    }
};

impl PredictionContext {
    /// Pairs a scaler with a classifier fitted on the same feature count.
    pub fn new(scaler: RobustScaler, classifier: Classifier) -> Result<Self, ArtifactError> {
        if scaler.n_features() != classifier.n_features() {
            return Err(ArtifactError::Incompatible {
                scaler_features: scaler.n_features(),
                classifier_features: classifier.n_features(),
            });
        }

        let unmapped = labels::unmapped(classifier.classes());
        if !unmapped.is_empty() {
            warn!(
                "Classifier declares class ids {:?} with no label; they will display as {}",
                unmapped,
                QualityLabel::Unknown.name()
            );
        }

        Ok(Self {
            scaler: Arc::new(scaler),
            classifier: Arc::new(classifier),
            paths: None,
        })
    }

    /// Loads both artifacts from `store`.
    pub fn load(store: &ArtifactStore) -> Result<Self, ArtifactError> {
        let (scaler, classifier) = store.load()?;
        let mut context = Self::new(scaler, classifier)?;
        context.paths = Some((store.scaler_path(), store.classifier_path()));
        info!("Prediction context ready");
        Ok(context)
    }

    pub fn scaler(&self) -> &RobustScaler {
        &self.scaler
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn info(&self) -> ContextInfo {
        let classes = self.classifier.classes().to_vec();
        ContextInfo {
            classifier_kind: self.classifier.kind(),
            unmapped_classes: labels::unmapped(&classes),
            classes,
            n_features: self.scaler.n_features(),
            scaler_path: self.paths.as_ref().map(|(scaler, _)| scaler.clone()),
            classifier_path: self.paths.as_ref().map(|(_, classifier)| classifier.clone()),
        }
    }

    /// Runs the full pipeline on named readings.
    pub fn predict(&self, inputs: &HashMap<String, f64>) -> Result<Prediction, PipelineError> {
        let mut request = Request::new();
        request.advance(Stage::Building);
        let result = features::build(inputs).and_then(|vector| self.run(vector, &mut request));
        request.finish(result)
    }

    /// Runs the pipeline on an already assembled vector.
    pub fn predict_vector(&self, features: FeatureVector) -> Result<Prediction, PipelineError> {
        let mut request = Request::new();
        let result = self.run(features, &mut request);
        request.finish(result)
    }

    fn run(&self, features: FeatureVector, request: &mut Request) -> Result<Prediction, PipelineError> {
        request.advance(Stage::Scaling);
        let scaled = self.scaler.transform(&features)?;

        request.advance(Stage::Classifying);
        let class_id = self.classifier.predict(&scaled)?;

        request.advance(Stage::Resolving);
        let label = labels::resolve(class_id);
        debug!("Class {} resolved to {}", class_id, label);

        Ok(Prediction {
            features,
            scaled,
            class_id,
            label,
        })
    }
}

/// Front door for request handlers.
///
/// Holds the outcome of the one load attempt made at startup. When that
/// attempt failed every request is refused with
/// [`PipelineError::Unavailable`]; the load is never retried.
#[derive(Debug, Clone)]
pub struct PredictionService {
    state: Result<PredictionContext, String>,
}

impl PredictionService {
    pub fn start(store: &ArtifactStore) -> Self {
        let state = PredictionContext::load(store).map_err(|e| {
            error!("FATAL: artifacts failed to load: {}", e);
            error!(
                "Ensure {:?} and {:?} exist and are readable",
                store.scaler_path(),
                store.classifier_path()
            );
            e.to_string()
        });
        Self { state }
    }

    pub fn from_context(context: PredictionContext) -> Self {
        Self { state: Ok(context) }
    }

    pub fn is_ready(&self) -> bool {
        self.state.is_ok()
    }

    pub fn context(&self) -> Option<&PredictionContext> {
        self.state.as_ref().ok()
    }

    /// Why the service is refusing requests, if it is.
    pub fn load_error(&self) -> Option<&str> {
        self.state.as_ref().err().map(String::as_str)
    }

    pub fn predict(&self, inputs: &HashMap<String, f64>) -> Result<Prediction, PipelineError> {
        match &self.state {
            Ok(context) => context.predict(inputs),
            Err(reason) => Err(PipelineError::Unavailable(reason.clone())),
        }
    }
}
