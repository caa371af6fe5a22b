use std::fmt;
use std::path::Path;

use log::debug;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::error::{ArtifactError, PipelineError};
use super::scaler::ScaledVector;
use super::utils::{argmax, normalize_row};

/// Integer output of the classifier, before it is mapped to a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassId(pub i64);

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ClassifierDocument {
    Linear {
        classes: Vec<i64>,
        coef: Vec<Vec<f64>>,
        intercept: Vec<f64>,
    },
    Forest {
        classes: Vec<i64>,
        n_features: usize,
        trees: Vec<TreeDocument>,
    },
}

/// Fitted tree in flat array layout; index 0 is the root.
#[derive(Debug, Clone, Deserialize)]
pub struct TreeDocument {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<Vec<f64>>,
}

/// Multinomial linear model (logistic regression, linear SVM, ...).
///
/// `coef` has one row per class, or a single row for a binary model whose
/// positive decision selects `classes[1]`.
#[derive(Debug, Clone)]
pub struct LinearModel {
    classes: Vec<i64>,
    coef: Array2<f64>,
    intercept: Array1<f64>,
}

impl LinearModel {
    pub fn new(classes: Vec<i64>, coef: Vec<Vec<f64>>, intercept: Vec<f64>) -> Result<Self, String> {
        if classes.len() < 2 {
            return Err(format!("need at least 2 classes, found {}", classes.len()));
        }
        let rows = coef.len();
        let binary = classes.len() == 2 && rows == 1;
        if rows != classes.len() && !binary {
            return Err(format!(
                "coef has {} rows for {} classes",
                rows,
                classes.len()
            ));
        }
        if intercept.len() != rows {
            return Err(format!(
                "intercept has {} entries for {} coef rows",
                intercept.len(),
                rows
            ));
        }
        let width = coef.first().map(Vec::len).unwrap_or(0);
        if width == 0 || coef.iter().any(|row| row.len() != width) {
            return Err("coef rows must be non-empty and of equal width".to_string());
        }
        if coef.iter().flatten().chain(&intercept).any(|v| !v.is_finite()) {
            return Err("weights must be finite".to_string());
        }

        let flat: Vec<f64> = coef.into_iter().flatten().collect();
        let coef = Array2::from_shape_vec((rows, width), flat).map_err(|e| e.to_string())?;

        Ok(Self {
            classes,
            coef,
            intercept: Array1::from_vec(intercept),
        })
    }

    pub fn n_features(&self) -> usize {
        self.coef.ncols()
    }

    /// Raw decision values, one per coef row.
    pub fn decision_function(&self, x: &ScaledVector) -> Result<Array1<f64>, PipelineError> {
        check_width(self.n_features(), x)?;
        Ok(self.coef.dot(x.values()) + &self.intercept)
    }

    fn predict(&self, x: &ScaledVector) -> Result<ClassId, PipelineError> {
        let decision = self.decision_function(x)?;
        debug!("Linear decision values: {:?}", decision);

        let index = if decision.len() == 1 {
            usize::from(decision[0] > 0.0)
        } else {
            argmax(decision.view()).ok_or_else(|| {
                PipelineError::Classification("decision function produced no finite score".into())
            })?
        };
        Ok(ClassId(self.classes[index]))
    }
}

#[derive(Debug, Clone)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        probabilities: Vec<f64>,
    },
}

/// A single decision tree with validated structure.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    /// Checks the flat arrays and converts them into nodes.
    ///
    /// Children must point forward, which rules out cycles, so traversal
    /// always reaches a leaf.
    pub fn from_document(
        doc: TreeDocument,
        n_features: usize,
        n_classes: usize,
    ) -> Result<Self, String> {
        let n = doc.children_left.len();
        if n == 0 {
            return Err("tree has no nodes".to_string());
        }
        if [
            doc.children_right.len(),
            doc.feature.len(),
            doc.threshold.len(),
            doc.value.len(),
        ]
        .iter()
        .any(|&len| len != n)
        {
            return Err("tree arrays have different lengths".to_string());
        }

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let left = doc.children_left[i];
            let right = doc.children_right[i];
            if left == -1 {
                let row = &doc.value[i];
                if row.len() != n_classes {
                    return Err(format!(
                        "leaf {} has {} values for {} classes",
                        i,
                        row.len(),
                        n_classes
                    ));
                }
                if row.iter().any(|v| !v.is_finite() || *v < 0.0) {
                    return Err(format!("leaf {} has invalid values", i));
                }
                nodes.push(Node::Leaf {
                    probabilities: normalize_row(row),
                });
                continue;
            }

            let child = |c: i64| -> Result<usize, String> {
                match usize::try_from(c) {
                    Ok(c) if c > i && c < n => Ok(c),
                    _ => Err(format!("node {} has invalid child {}", i, c)),
                }
            };
            let feature = usize::try_from(doc.feature[i])
                .ok()
                .filter(|&f| f < n_features)
                .ok_or_else(|| format!("node {} splits on invalid feature {}", i, doc.feature[i]))?;
            let threshold = doc.threshold[i];
            if threshold.is_nan() {
                return Err(format!("node {} has a NaN threshold", i));
            }

            nodes.push(Node::Split {
                feature,
                threshold,
                left: child(left)?,
                right: child(right)?,
            });
        }

        Ok(Self { nodes })
    }

    fn leaf_probabilities(&self, x: &[f64]) -> &[f64] {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { probabilities } => return probabilities,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if x[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

/// Ensemble of decision trees voting by mean class probability.
#[derive(Debug, Clone)]
pub struct ForestModel {
    classes: Vec<i64>,
    n_features: usize,
    trees: Vec<DecisionTree>,
}

impl ForestModel {
    pub fn new(classes: Vec<i64>, n_features: usize, trees: Vec<TreeDocument>) -> Result<Self, String> {
        if classes.is_empty() {
            return Err("forest has no classes".to_string());
        }
        if n_features == 0 {
            return Err("forest has no features".to_string());
        }
        if trees.is_empty() {
            return Err("forest has no trees".to_string());
        }
        let trees = trees
            .into_iter()
            .enumerate()
            .map(|(i, doc)| {
                DecisionTree::from_document(doc, n_features, classes.len())
                    .map_err(|e| format!("tree {}: {}", i, e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            classes,
            n_features,
            trees,
        })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Mean leaf probabilities across all trees.
    pub fn predict_proba(&self, x: &ScaledVector) -> Result<Array1<f64>, PipelineError> {
        check_width(self.n_features, x)?;
        let values = x.to_vec();
        let mut total = Array1::<f64>::zeros(self.classes.len());
        for tree in &self.trees {
            for (acc, p) in total.iter_mut().zip(tree.leaf_probabilities(&values)) {
                *acc += p;
            }
        }
        Ok(total / self.trees.len() as f64)
    }

    fn predict(&self, x: &ScaledVector) -> Result<ClassId, PipelineError> {
        let proba = self.predict_proba(x)?;
        debug!("Forest class probabilities: {:?}", proba);
        let index = argmax(proba.view())
            .ok_or_else(|| PipelineError::Classification("forest produced no probabilities".into()))?;
        Ok(ClassId(self.classes[index]))
    }
}

fn check_width(expected: usize, x: &ScaledVector) -> Result<(), PipelineError> {
    if x.len() != expected {
        return Err(PipelineError::Classification(format!(
            "classifier expects {} features, got {}",
            expected,
            x.len()
        )));
    }
    Ok(())
}

/// A fitted multi-class classifier.
#[derive(Debug)]
pub enum Classifier {
    Linear(LinearModel),
    Forest(ForestModel),
    #[cfg(feature = "onnx")]
    Onnx(super::onnx::OnnxModel),
}

impl Classifier {
    /// Decodes a JSON classifier artifact. `path` is only used in error messages.
    pub fn from_json(bytes: &[u8], path: &Path) -> Result<Self, ArtifactError> {
        let doc: ClassifierDocument = serde_json::from_slice(bytes)
            .map_err(|e| ArtifactError::malformed(path, e.to_string()))?;

        let classifier = match doc {
            ClassifierDocument::Linear {
                classes,
                coef,
                intercept,
            } => LinearModel::new(classes, coef, intercept).map(Self::Linear),
            ClassifierDocument::Forest {
                classes,
                n_features,
                trees,
            } => ForestModel::new(classes, n_features, trees).map(Self::Forest),
        };
        classifier.map_err(|reason| ArtifactError::malformed(path, reason))
    }

    /// Short name of the model family.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Linear(_) => "linear",
            Self::Forest(_) => "forest",
            #[cfg(feature = "onnx")]
            Self::Onnx(_) => "onnx",
        }
    }

    /// Class ids the model can emit, when the artifact declares them.
    pub fn classes(&self) -> &[i64] {
        match self {
            Self::Linear(model) => &model.classes,
            Self::Forest(model) => &model.classes,
            #[cfg(feature = "onnx")]
            Self::Onnx(_) => &[],
        }
    }

    pub fn n_features(&self) -> usize {
        match self {
            Self::Linear(model) => model.n_features(),
            Self::Forest(model) => model.n_features,
            #[cfg(feature = "onnx")]
            Self::Onnx(model) => model.n_features(),
        }
    }

    /// Runs a batch of one through the model and returns its class id.
    pub fn predict(&self, x: &ScaledVector) -> Result<ClassId, PipelineError> {
        check_width(self.n_features(), x)?;
        match self {
            Self::Linear(model) => model.predict(x),
            Self::Forest(model) => model.predict(x),
            #[cfg(feature = "onnx")]
            Self::Onnx(model) => model.predict(x),
        }
    }
}
