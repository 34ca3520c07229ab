//! Detection throughput benchmark
//!
//! Measures how long the detection strategies take to compare two profiles
//! with a growing number of uids. Every uid carries a linear, a quadratic
//! and a regressogram model.
//!
//! # Run Instructions
//!
//! ```bash
//! cargo bench --bench detection_throughput
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use perfcheck::model::ModelKind;
use perfcheck::profile::{ModelEntry, Profile, ResourceRow};
use perfcheck::{CheckConfig, CheckMethod, Checker, DetectionContext};

/// Profile with `uids` locations whose models scale with `scale`
fn create_bench_profile(uids: usize, scale: f64) -> Profile {
    (0..uids).fold(Profile::new(), |profile, i| {
        let uid = format!("function_{}", i);
        let slope = scale * (1.0 + i as f64 / 10.0);
        let mut profile = profile
            .with_model(ModelEntry::parametric(
                uid.as_str(),
                ModelKind::Linear,
                0.95,
                &[2.0 * scale, slope],
                1.0,
                1000.0,
            ))
            .with_model(ModelEntry::parametric(
                uid.as_str(),
                ModelKind::Quadratic,
                0.9,
                &[2.0 * scale, slope, 0.001 * scale],
                1.0,
                1000.0,
            ))
            .with_model(ModelEntry::nonparametric(
                uid.as_str(),
                ModelKind::Regressogram,
                0.8,
                (1..=20).map(|b| b as f64 * slope * 50.0).collect(),
                1.0,
                1000.0,
            ));
        for size in (1..=1000).step_by(100) {
            profile = profile.with_resource(
                ResourceRow::new(uid.as_str(), 2.0 * scale + slope * size as f64)
                    .with_field("structure-unit-size", size as f64),
            );
        }
        profile
    })
}

fn bench_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("detection_throughput");
    let config = CheckConfig::default();
    let ctx = DetectionContext::new(&config);

    for uids in [10, 100] {
        let baseline = create_bench_profile(uids, 1.0);
        let target = create_bench_profile(uids, 1.3);

        for method in [
            CheckMethod::IntegralComparison,
            CheckMethod::LocalStatistics,
            CheckMethod::PolynomialRegression,
            CheckMethod::AverageAmountThreshold,
        ] {
            group.bench_with_input(BenchmarkId::new(method.name(), uids), &uids, |b, _| {
                b.iter(|| {
                    let report = method
                        .check(black_box(&baseline), black_box(&target), &ctx)
                        .unwrap();
                    black_box(report)
                });
            });
        }
    }
    group.finish();
}

fn bench_all_models_strategy(c: &mut Criterion) {
    let config = CheckConfig {
        models_strategy: perfcheck::ModelsStrategy::AllModels,
        ..CheckConfig::default()
    };
    let ctx = DetectionContext::new(&config);
    let baseline = create_bench_profile(50, 1.0);
    let target = create_bench_profile(50, 0.7);

    c.bench_function("integral_comparison_all_models", |b| {
        b.iter(|| {
            CheckMethod::IntegralComparison
                .check(black_box(&baseline), black_box(&target), &ctx)
                .unwrap()
        });
    });
}

criterion_group!(benches, bench_strategies, bench_all_models_strategy);
criterion_main!(benches);
