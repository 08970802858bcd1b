//! Benchmarks for windowed estimator ingest
//!
//! Every estimator is fed 50-sample batches at the instrument's packet rate;
//! sorting estimators (trimmed sum, percentile) dominate the cost, so the
//! default window sizes are benchmarked as deployed.
//!
//! Platform: Cross-platform (synthetic batches, CI-safe)

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use radiometer::estimators::{EstimatorConfig, EstimatorInput};
use radiometer::test_utils::batch;
use std::hint::black_box;

fn configs() -> Vec<EstimatorConfig> {
    [
        "kind: trimmed_sort_sum",
        "kind: percentile",
        "kind: median",
        "kind: rolling_mean",
        "kind: convolution_min",
        "kind: min_min",
        "kind: accumulator",
        "kind: isoluminance",
    ]
    .iter()
    .map(|yaml| serde_yaml_ng::from_str(yaml).expect("valid estimator config"))
    .collect()
}

fn bench_ingest(c: &mut Criterion) {
    let batches: Vec<_> = (0..64)
        .map(|i| {
            let values: Vec<f64> = (0..50).map(|j| ((i * 31 + j * 17) % 997) as f64).collect();
            batch(&values)
        })
        .collect();

    let mut group = c.benchmark_group("estimator_ingest");
    group.throughput(Throughput::Elements(50));

    for config in configs() {
        let mut estimator = config.build().expect("default config builds");

        // Saturate the window so every iteration computes a result.
        for batch in batches.iter().cycle().take(estimator.window_capacity()) {
            estimator.ingest(&EstimatorInput::Batch(batch));
        }

        let mut next = batches.iter().cycle();
        group.bench_function(BenchmarkId::from_parameter(config.name()), |b| {
            b.iter(|| {
                let batch = next.next().expect("cycle never ends");
                black_box(estimator.ingest(black_box(&EstimatorInput::Batch(batch))))
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_ingest);
criterion_main!(benches);
