// Integral comparison
//
// Compares the definite integrals of the paired models over their intervals.
// Parametric models integrate their formula in closed form, non-parametric
// ones use Simpson's rule over the aligned bucket coordinates.

use super::Checker;
use crate::change::{classify_change, ChangeResult};
use crate::curve::integrate;
use crate::detection::{run_detection_with_strategy, DetectionContext};
use crate::error::Result;
use crate::model::ModelRecord;
use crate::nonparam::preprocess_nonparam_models;
use crate::numeric::{finite_or_zero, round_to, safe_division, simpson};
use crate::profile::Profile;
use crate::report::CheckReport;

/// Integral comparison strategy
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegralComparison;

impl Checker for IntegralComparison {
    fn check(
        &self,
        baseline: &Profile,
        target: &Profile,
        ctx: &DetectionContext<'_>,
    ) -> Result<CheckReport> {
        Ok(run_detection_with_strategy(
            "integral_comparison",
            compute_integral_comparison,
            baseline,
            target,
            ctx,
        ))
    }
}

/// Relative difference of the integrals of two models of one uid
///
/// The relative error is rounded to two decimals; the verdict uses the
/// unrounded value.
pub fn compute_integral_comparison(
    uid: &str,
    baseline: &ModelRecord,
    target: &ModelRecord,
    target_profile: &Profile,
    ctx: &DetectionContext<'_>,
) -> Result<ChangeResult> {
    let aligned =
        preprocess_nonparam_models(uid, baseline, target_profile, target, ctx.fitter, ctx.samples())?;

    let baseline_integral = if baseline.is_parametric() {
        integrate(baseline, ctx.samples())
    } else {
        simpson(&aligned.x, &aligned.baseline_y)
    };
    let target_integral = if target.is_parametric() {
        integrate(target, ctx.samples())
    } else {
        simpson(&aligned.x, &aligned.target_y)
    };

    let rel_error = finite_or_zero(safe_division(
        target_integral - baseline_integral,
        baseline_integral,
    ));
    let thresholds = &ctx.config.thresholds;
    let change = classify_change(
        rel_error,
        thresholds.integral_no_change,
        thresholds.integral_change,
        1.0,
    );
    Ok(ChangeResult::new(change, round_to(rel_error, 2)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::PerformanceChange;
    use crate::config::CheckConfig;
    use crate::model::ModelKind;

    fn constant(b0: f64) -> ModelRecord {
        ModelRecord::parametric(ModelKind::Constant, 0.95, b0, 0.0, 0.0).with_interval(0.0, 100.0)
    }

    #[test]
    fn test_small_increase_is_no_change() {
        let config = CheckConfig::default();
        let ctx = DetectionContext::new(&config);
        let result =
            compute_integral_comparison("f", &constant(10.0), &constant(10.05), &Profile::new(), &ctx)
                .unwrap();
        assert_eq!(result.change, PerformanceChange::NoChange);
        assert!(result.rel_error.abs() <= 0.01);
    }

    #[test]
    fn test_half_increase_is_degradation() {
        let config = CheckConfig::default();
        let ctx = DetectionContext::new(&config);
        let result =
            compute_integral_comparison("f", &constant(10.0), &constant(15.0), &Profile::new(), &ctx)
                .unwrap();
        assert_eq!(result.change, PerformanceChange::Degradation);
        assert_eq!(result.rel_error, 0.5);
    }

    #[test]
    fn test_zero_baseline_integral() {
        let config = CheckConfig::default();
        let ctx = DetectionContext::new(&config);
        let result =
            compute_integral_comparison("f", &constant(0.0), &constant(15.0), &Profile::new(), &ctx)
                .unwrap();
        assert_eq!(result.change, PerformanceChange::NoChange);
        assert_eq!(result.rel_error, 0.0);
    }

    #[test]
    fn test_regressograms_use_simpson() {
        let config = CheckConfig::default();
        let ctx = DetectionContext::new(&config);
        let baseline = ModelRecord::nonparametric(ModelKind::Regressogram, 0.9, vec![10.0; 5])
            .with_interval(0.0, 100.0);
        let target = ModelRecord::nonparametric(ModelKind::Regressogram, 0.9, vec![8.0; 5])
            .with_interval(0.0, 100.0);
        let result =
            compute_integral_comparison("f", &baseline, &target, &Profile::new(), &ctx).unwrap();
        assert_eq!(result.change, PerformanceChange::MaybeOptimization);
        assert_eq!(result.rel_error, -0.2);
    }
}
