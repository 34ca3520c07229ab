//! Comprehensive property-based tests for pre-commit hook
//!
//! This test suite covers the core detection primitives of perfcheck using
//! property-based testing with proptest. Designed to run under 30 seconds as
//! a pre-commit quality gate.
//!
//! Core features tested:
//! 1. Three-tier change classification and its sign symmetry
//! 2. Deterministic model curve sampling
//! 3. Regressogram reconciliation
//! 4. Identity comparisons through the detection strategies

use perfcheck::change::{classify_change, PerformanceChange};
use perfcheck::config::CheckConfig;
use perfcheck::curve::get_function_values;
use perfcheck::detection::DetectionContext;
use perfcheck::fitting::LeastSquaresFitter;
use perfcheck::model::{ModelKind, ModelRecord};
use perfcheck::nonparam::preprocess_nonparam_models;
use perfcheck::profile::{ModelEntry, Profile, ResourceRow};
use perfcheck::{CheckMethod, Checker};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_classifier_boundaries(
        diff in -10.0f64..10.0,
        no_change in 0.0f64..1.0,
        gap in 0.001f64..1.0,
    ) {
        let change = no_change + gap;
        let verdict = classify_change(diff, no_change, change, 1.0);

        // Property: the magnitude selects the tier, the sign selects the side
        if diff.abs() <= no_change {
            prop_assert_eq!(verdict, PerformanceChange::NoChange);
        } else if diff.abs() <= change {
            let expected = if diff < 0.0 {
                PerformanceChange::MaybeOptimization
            } else {
                PerformanceChange::MaybeDegradation
            };
            prop_assert_eq!(verdict, expected);
        } else {
            let expected = if diff < 0.0 {
                PerformanceChange::Optimization
            } else {
                PerformanceChange::Degradation
            };
            prop_assert_eq!(verdict, expected);
        }
    }

    #[test]
    fn prop_classifier_sign_symmetry(
        diff in -10.0f64..10.0,
        no_change in 0.0f64..1.0,
        gap in 0.001f64..1.0,
        scale in 1.0f64..8.0,
    ) {
        let change = no_change + gap;
        let forward = classify_change(diff, no_change, change, scale);
        let backward = classify_change(-diff, no_change, change, scale);
        prop_assert_eq!(backward, forward.mirror());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_curve_sampling_deterministic(
        kind_index in 0usize..6,
        b0 in 0.1f64..100.0,
        b1 in 0.1f64..3.0,
        b2 in -1.0f64..1.0,
        x_start in 0.0f64..50.0,
        width in 1.0f64..100.0,
        samples in 2usize..500,
    ) {
        let kind = ModelKind::PARAMETRIC[kind_index];
        let model = ModelRecord::parametric(kind, 0.9, b0, b1, b2)
            .with_interval(x_start, x_start + width);

        let first = get_function_values(&model, samples);
        let second = get_function_values(&model, samples);

        // Property: sampling is pure and yields the requested number of points
        prop_assert_eq!(first.x.len(), samples);
        prop_assert_eq!(first.y.len(), samples);
        prop_assert_eq!(&first.x, &second.x);
        for (a, b) in first.y.iter().zip(second.y.iter()) {
            prop_assert!(a.to_bits() == b.to_bits() || (a.is_nan() && b.is_nan()));
        }
    }

    #[test]
    fn prop_reconciled_regressograms_align(
        baseline_buckets in 1usize..30,
        target_buckets in 1usize..30,
        amounts in prop::collection::vec(1.0f64..1000.0, 5..60),
    ) {
        let target_profile = amounts.iter().enumerate().fold(
            Profile::new().with_model(ModelEntry::nonparametric(
                "f",
                ModelKind::Regressogram,
                0.8,
                vec![1.0; target_buckets],
                0.0,
                (amounts.len() - 1) as f64,
            )),
            |profile, (i, amount)| {
                profile.with_resource(
                    ResourceRow::new("f", *amount).with_field("structure-unit-size", i as f64),
                )
            },
        );
        let baseline = ModelRecord::nonparametric(
            ModelKind::Regressogram,
            0.8,
            vec![1.0; baseline_buckets],
        )
        .with_interval(0.0, (amounts.len() - 1) as f64);
        let target = ModelRecord::nonparametric(
            ModelKind::Regressogram,
            0.8,
            vec![1.0; target_buckets],
        )
        .with_interval(0.0, (amounts.len() - 1) as f64);

        let aligned = preprocess_nonparam_models(
            "f",
            &baseline,
            &target_profile,
            &target,
            &LeastSquaresFitter,
            1000,
        )
        .unwrap();

        // Property: both sides end up with the baseline's bucket count
        prop_assert_eq!(aligned.baseline_y.len(), aligned.target_y.len());
        prop_assert_eq!(aligned.x.len(), baseline_buckets);
        prop_assert_eq!(aligned.target_y.len(), baseline_buckets);
    }

    #[test]
    fn prop_identity_comparison_no_change(
        b0 in 1.0f64..1000.0,
        b1 in 0.1f64..10.0,
        r_square in 0.2f64..1.0,
    ) {
        let profile = Profile::new().with_model(ModelEntry::parametric(
            "f",
            ModelKind::Linear,
            r_square,
            &[b0, b1],
            1.0,
            100.0,
        ));
        let config = CheckConfig::default();
        let ctx = DetectionContext::new(&config);

        // Property: a profile compared with itself never changes
        for method in [
            CheckMethod::IntegralComparison,
            CheckMethod::LocalStatistics,
            CheckMethod::PolynomialRegression,
            CheckMethod::BestModelOrderEquality,
        ] {
            let report = method.check(&profile, &profile, &ctx).unwrap();
            prop_assert_eq!(report.degradations.len(), 1);
            prop_assert_eq!(report.degradations[0].result, PerformanceChange::NoChange);
        }
    }
}
