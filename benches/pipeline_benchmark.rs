use std::collections::HashMap;
use std::path::PathBuf;

use airox::{build, classify, scale, ArtifactStore, Config, Feature, FeatureVector, PredictionContext};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn setup_benchmark_context(classifier_file: &str) -> PredictionContext {
    let config = Config::default()
        .with_artifacts_dir(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures"))
        .with_classifier_file(classifier_file);
    PredictionContext::load(&ArtifactStore::from_config(&config)).unwrap()
}

fn default_readings() -> HashMap<String, f64> {
    Feature::ALL
        .iter()
        .map(|feature| (feature.name().to_string(), feature.default_value()))
        .collect()
}

fn bench_stages(c: &mut Criterion) {
    let context = setup_benchmark_context("classifier.json");
    let readings = default_readings();
    let vector = FeatureVector::defaults();
    let scaled = scale(context.scaler(), &vector).unwrap();

    let mut group = c.benchmark_group("Stages");
    group.sample_size(50);
    group.warm_up_time(std::time::Duration::from_secs(1));

    group.bench_function("build", |b| b.iter(|| build(black_box(&readings)).unwrap()));
    group.bench_function("scale", |b| {
        b.iter(|| scale(context.scaler(), black_box(&vector)).unwrap())
    });
    group.bench_function("classify_linear", |b| {
        b.iter(|| classify(context.classifier(), black_box(&scaled)).unwrap())
    });

    group.finish();
}

fn bench_prediction(c: &mut Criterion) {
    let mut group = c.benchmark_group("Prediction");
    group.sample_size(50);
    group.warm_up_time(std::time::Duration::from_secs(1));

    let readings = default_readings();
    for (name, file) in [("linear", "classifier.json"), ("forest", "forest_classifier.json")] {
        let context = setup_benchmark_context(file);
        group.bench_function(format!("predict_{}", name), |b| {
            b.iter(|| context.predict(black_box(&readings)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_stages, bench_prediction);
criterion_main!(benches);
