use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use airox::artifacts::sha256_hex;
use airox::{
    ArtifactError, ArtifactStore, Config, Feature, PipelineError, PredictionContext,
    PredictionService,
};
use env_logger::{Builder, Env};
use tempfile::TempDir;

fn init() {
    let _ = Builder::from_env(Env::default().default_filter_or("warn")).try_init();
}

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

/// Temporary artifacts directory holding copies of the named fixtures.
fn artifacts_with(files: &[&str]) -> TempDir {
    init();
    let dir = TempDir::new().unwrap();
    for name in files {
        fs::copy(fixtures_dir().join(name), dir.path().join(name)).unwrap();
    }
    dir
}

fn write_manifest(dir: &Path, entries: &[(&str, String)]) {
    let files: HashMap<&str, &str> = entries
        .iter()
        .map(|(name, digest)| (*name, digest.as_str()))
        .collect();
    let manifest = serde_json::json!({ "files": files });
    fs::write(dir.join("manifest.json"), manifest.to_string()).unwrap();
}

fn digest_of(dir: &Path, name: &str) -> String {
    sha256_hex(&fs::read(dir.join(name)).unwrap())
}

fn default_readings() -> HashMap<String, f64> {
    Feature::ALL
        .iter()
        .map(|feature| (feature.name().to_string(), feature.default_value()))
        .collect()
}

#[test]
fn test_load_present_artifacts() {
    let dir = artifacts_with(&["robust_scaler.json", "classifier.json"]);
    let store = ArtifactStore::new(dir.path());
    assert!(store.is_present());

    let (scaler, classifier) = store.load().unwrap();
    assert_eq!(scaler.n_features(), 9);
    assert_eq!(classifier.kind(), "linear");
}

#[test]
fn test_missing_scaler() {
    let dir = artifacts_with(&["classifier.json"]);
    let store = ArtifactStore::new(dir.path());
    assert!(!store.is_present());

    match store.load() {
        Err(ArtifactError::Missing { path, .. }) => {
            assert!(path.ends_with("robust_scaler.json"))
        }
        other => panic!("expected Missing, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_missing_classifier() {
    let dir = artifacts_with(&["robust_scaler.json"]);
    let store = ArtifactStore::new(dir.path());

    match store.load() {
        Err(ArtifactError::Missing { path, .. }) => assert!(path.ends_with("classifier.json")),
        other => panic!("expected Missing, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_service_refuses_after_failed_load() {
    let dir = artifacts_with(&[]);
    let service = PredictionService::start(&ArtifactStore::new(dir.path()));
    assert!(!service.is_ready());
    assert!(service.context().is_none());
    assert!(service.load_error().unwrap().contains("robust_scaler.json"));

    // Artifacts appearing later do not revive the service.
    for name in ["robust_scaler.json", "classifier.json"] {
        fs::copy(fixtures_dir().join(name), dir.path().join(name)).unwrap();
    }
    for _ in 0..3 {
        assert!(matches!(
            service.predict(&default_readings()),
            Err(PipelineError::Unavailable(_))
        ));
    }
}

#[test]
fn test_service_serves_after_successful_load() {
    let dir = artifacts_with(&["robust_scaler.json", "classifier.json"]);
    let service = PredictionService::start(&ArtifactStore::new(dir.path()));
    assert!(service.is_ready());
    let prediction = service.predict(&default_readings()).unwrap();
    assert_eq!(prediction.class_id.0, 2);
}

#[test]
fn test_manifest_match() {
    let dir = artifacts_with(&["robust_scaler.json", "classifier.json"]);
    write_manifest(
        dir.path(),
        &[
            ("robust_scaler.json", digest_of(dir.path(), "robust_scaler.json")),
            ("classifier.json", digest_of(dir.path(), "classifier.json")),
        ],
    );

    let store = ArtifactStore::new(dir.path());
    assert!(store.verify().unwrap());
    assert!(store.load().is_ok());
}

#[test]
fn test_manifest_mismatch() {
    let dir = artifacts_with(&["robust_scaler.json", "classifier.json"]);
    write_manifest(
        dir.path(),
        &[
            ("robust_scaler.json", digest_of(dir.path(), "robust_scaler.json")),
            ("classifier.json", "0".repeat(64)),
        ],
    );

    let store = ArtifactStore::new(dir.path());
    assert!(!store.verify().unwrap());
    match store.load() {
        Err(ArtifactError::HashMismatch { file_name, .. }) => {
            assert_eq!(file_name, "classifier.json")
        }
        other => panic!("expected HashMismatch, got {:?}", other.map(|_| ())),
    }

    let config = Config::default()
        .with_artifacts_dir(dir.path())
        .with_verify_manifest(false);
    assert!(ArtifactStore::from_config(&config).load().is_ok());
}

#[test]
fn test_malformed_classifier() {
    let dir = artifacts_with(&["robust_scaler.json"]);
    fs::write(dir.path().join("classifier.json"), "{\"kind\": \"linear\", \"classes\": [").unwrap();

    let result = ArtifactStore::new(dir.path()).load();
    assert!(matches!(result, Err(ArtifactError::Malformed { .. })));
}

#[test]
fn test_unknown_classifier_kind() {
    let dir = artifacts_with(&["robust_scaler.json"]);
    fs::write(
        dir.path().join("classifier.json"),
        r#"{"kind": "gradient_boosting", "classes": [0, 1, 2]}"#,
    )
    .unwrap();

    let result = ArtifactStore::new(dir.path()).load();
    assert!(matches!(result, Err(ArtifactError::Malformed { .. })));
}

#[test]
fn test_reordered_scaler_features_rejected() {
    let dir = artifacts_with(&["classifier.json"]);
    let mut scaler: serde_json::Value =
        serde_json::from_slice(&fs::read(fixtures_dir().join("robust_scaler.json")).unwrap())
            .unwrap();
    let names = scaler["feature_names"].as_array_mut().unwrap();
    names.swap(2, 3);
    fs::write(dir.path().join("robust_scaler.json"), scaler.to_string()).unwrap();

    let result = ArtifactStore::new(dir.path()).load();
    assert!(matches!(result, Err(ArtifactError::Malformed { .. })));
}

#[test]
fn test_incompatible_feature_counts() {
    let dir = artifacts_with(&["robust_scaler.json"]);
    fs::write(
        dir.path().join("classifier.json"),
        r#"{"kind": "linear", "classes": [0, 1], "coef": [[1.0, 2.0, 3.0]], "intercept": [0.0]}"#,
    )
    .unwrap();

    let result = PredictionContext::load(&ArtifactStore::new(dir.path()));
    assert!(matches!(
        result,
        Err(ArtifactError::Incompatible {
            scaler_features: 9,
            classifier_features: 3
        })
    ));
}

#[test]
fn test_custom_file_names() {
    let dir = artifacts_with(&["robust_scaler.json", "forest_classifier.json"]);
    fs::rename(
        dir.path().join("robust_scaler.json"),
        dir.path().join("scaler_v2.json"),
    )
    .unwrap();

    let config = Config::default()
        .with_artifacts_dir(dir.path())
        .with_scaler_file("scaler_v2.json")
        .with_classifier_file("forest_classifier.json");
    let context = PredictionContext::load(&ArtifactStore::from_config(&config)).unwrap();
    assert_eq!(context.classifier().kind(), "forest");
}

#[cfg(not(feature = "onnx"))]
#[test]
fn test_onnx_classifier_needs_feature() {
    let dir = artifacts_with(&["robust_scaler.json"]);
    fs::write(dir.path().join("model.onnx"), b"\x08\x07").unwrap();

    let config = Config::default()
        .with_artifacts_dir(dir.path())
        .with_classifier_file("model.onnx");
    let result = ArtifactStore::from_config(&config).load();
    assert!(matches!(result, Err(ArtifactError::Malformed { .. })));
}

#[cfg(feature = "onnx")]
mod onnx_classifier {
    use super::*;
    use airox::{classify, ClassId, QualityLabel, ScaledVector};

    fn varint(out: &mut Vec<u8>, mut value: u64) {
        while value >= 0x80 {
            out.push((value as u8) | 0x80);
            value >>= 7;
        }
        out.push(value as u8);
    }

    fn int_field(out: &mut Vec<u8>, field: u64, value: u64) {
        varint(out, field << 3);
        varint(out, value);
    }

    fn bytes_field(out: &mut Vec<u8>, field: u64, data: &[u8]) {
        varint(out, (field << 3) | 2);
        varint(out, data.len() as u64);
        out.extend_from_slice(data);
    }

    fn tensor_info(name: &str, elem_type: u64, dims: &[u64]) -> Vec<u8> {
        let mut shape = Vec::new();
        for &dim in dims {
            let mut dimension = Vec::new();
            int_field(&mut dimension, 1, dim);
            bytes_field(&mut shape, 1, &dimension);
        }
        let mut tensor = Vec::new();
        int_field(&mut tensor, 1, elem_type);
        bytes_field(&mut tensor, 2, &shape);
        let mut type_proto = Vec::new();
        bytes_field(&mut type_proto, 1, &tensor);

        let mut info = Vec::new();
        bytes_field(&mut info, 1, name.as_bytes());
        bytes_field(&mut info, 2, &type_proto);
        info
    }

    fn int_attribute(name: &str, value: u64) -> Vec<u8> {
        let mut attribute = Vec::new();
        bytes_field(&mut attribute, 1, name.as_bytes());
        int_field(&mut attribute, 3, value);
        int_field(&mut attribute, 20, 2); // AttributeType::INT
        attribute
    }

    /// Model whose label is the index of the largest scaled feature:
    /// float32 X[1, 9] -> ArgMax(axis = 1, keepdims = 0) -> int64 Y[1].
    fn argmax_model() -> Vec<u8> {
        let mut node = Vec::new();
        bytes_field(&mut node, 1, b"X");
        bytes_field(&mut node, 2, b"Y");
        bytes_field(&mut node, 4, b"ArgMax");
        bytes_field(&mut node, 5, &int_attribute("axis", 1));
        bytes_field(&mut node, 5, &int_attribute("keepdims", 0));

        let mut graph = Vec::new();
        bytes_field(&mut graph, 1, &node);
        bytes_field(&mut graph, 2, b"argmax");
        bytes_field(&mut graph, 11, &tensor_info("X", 1, &[1, 9]));
        bytes_field(&mut graph, 12, &tensor_info("Y", 7, &[1]));

        let mut opset = Vec::new();
        int_field(&mut opset, 2, 13);

        let mut model = Vec::new();
        int_field(&mut model, 1, 7);
        bytes_field(&mut model, 2, b"airox-tests");
        bytes_field(&mut model, 7, &graph);
        bytes_field(&mut model, 8, &opset);
        model
    }

    fn onnx_context() -> PredictionContext {
        let dir = artifacts_with(&["robust_scaler.json"]);
        fs::write(dir.path().join("argmax.onnx"), argmax_model()).unwrap();
        let config = Config::default()
            .with_artifacts_dir(dir.path())
            .with_classifier_file("argmax.onnx");
        PredictionContext::load(&ArtifactStore::from_config(&config)).unwrap()
    }

    #[test]
    fn test_onnx_classifier_predicts() {
        let context = onnx_context();
        assert_eq!(context.classifier().kind(), "onnx");
        assert_eq!(context.classifier().n_features(), 9);

        let mut scaled = vec![0.0; 9];
        scaled[2] = 5.0;
        let class_id = classify(context.classifier(), &ScaledVector::from_raw(scaled)).unwrap();
        assert_eq!(class_id, ClassId(2));

        // Population density dominates the scaled reference reading.
        let prediction = context.predict(&default_readings()).unwrap();
        assert_eq!(prediction.class_id, ClassId(8));
        assert_eq!(prediction.label, QualityLabel::Unknown);
    }

    #[test]
    fn test_onnx_width_mismatch() {
        let context = onnx_context();
        let result = classify(context.classifier(), &ScaledVector::from_raw(vec![1.0; 3]));
        assert!(matches!(result, Err(PipelineError::Classification(_))));
    }

    #[test]
    fn test_invalid_onnx_is_malformed() {
        let dir = artifacts_with(&["robust_scaler.json"]);
        fs::write(dir.path().join("broken.onnx"), b"not a model").unwrap();
        let config = Config::default()
            .with_artifacts_dir(dir.path())
            .with_classifier_file("broken.onnx");
        let result = ArtifactStore::from_config(&config).load();
        assert!(matches!(result, Err(ArtifactError::Malformed { .. })));
    }
}
