//! Prediction path benchmarks
//!
//! - Nearest-centroid assignment at increasing batch sizes
//! - Demo-mode predict through the estimator and the bare sampler

use cluster_estimator::config::ModelSettings;
use cluster_estimator::models::{FeatureRow, demo_labels};
use cluster_estimator::{CentroidModel, ClusterModel, CustomerClusterEstimator, ModelLocation};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::time::Duration;
use tokio::runtime::Runtime;

const FEATURES: usize = 21;
const CLUSTERS: usize = 3;

fn model() -> CentroidModel {
    let centroids = (0..CLUSTERS)
        .map(|c| (0..FEATURES).map(|f| (c * FEATURES + f) as f64 / 10.0).collect())
        .collect();
    CentroidModel::new(centroids).unwrap()
}

fn rows(count: usize) -> Vec<FeatureRow> {
    (0..count)
        .map(|i| (0..FEATURES).map(|f| ((i * 31 + f * 7) % 97) as f64 / 10.0).collect())
        .collect()
}

fn bench_centroid_predict(c: &mut Criterion) {
    let model = model();
    let mut group = c.benchmark_group("centroid_predict");

    for batch in [1, 100, 10_000] {
        let rows = rows(batch);
        group.bench_with_input(BenchmarkId::new("rows", batch), &rows, |b, rows| {
            b.iter(|| black_box(model.predict(rows).unwrap()));
        });
    }
    group.finish();
}

fn bench_demo_predict(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let settings = ModelSettings {
        cluster_count: CLUSTERS,
        ..Default::default()
    };
    let estimator = CustomerClusterEstimator::new_with_store(
        ModelLocation::new(&settings.bucket, &settings.key),
        None,
        &settings,
        Duration::from_secs(1),
    );
    let mut group = c.benchmark_group("demo_predict");

    for batch in [1, 100, 10_000] {
        let rows = rows(batch);
        group.bench_with_input(BenchmarkId::new("estimator", batch), &rows, |b, rows| {
            b.to_async(&rt)
                .iter(|| async { black_box(estimator.predict(rows).await.unwrap()) });
        });
        group.bench_with_input(BenchmarkId::new("sampler", batch), &batch, |b, batch| {
            b.iter(|| black_box(demo_labels(*batch, CLUSTERS)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_centroid_predict, bench_demo_predict);
criterion_main!(benches);
