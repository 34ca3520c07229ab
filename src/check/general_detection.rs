// Shared driver of the polynomial-regression, linear-regression and fast-check strategies
//
// For every uid having a best parametric model and a linear model on both
// sides, the curves of the best models and of the linear models are sampled
// and subtracted. Coefficients within tolerance mean no change; otherwise a
// strategy-specific classifier labels the shape of the difference and its
// magnitude decides between a change and a maybe-change.

use crate::change::{DegradationInfo, PerformanceChange};
use crate::curve::get_function_values;
use crate::detection::{report_missing_locations, DetectionContext};
use crate::error::Result;
use crate::model::{create_model_record, ModelKind, ModelRecord};
use crate::numeric::{finite_or_zero, mean, safe_division};
use crate::profile::{ModelEntry, ModelGroup, Profile};
use crate::report::CheckReport;
use crate::selector::{select_entries, ModelFilter};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Classifier labelling the shape of a change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationMethod {
    PolynomialRegression,
    LinearRegression,
    FastCheck,
}

impl ClassificationMethod {
    pub fn strategy_name(&self) -> &'static str {
        match self {
            ClassificationMethod::PolynomialRegression => "polynomial_regression",
            ClassificationMethod::LinearRegression => "linear_regression",
            ClassificationMethod::FastCheck => "fast_check",
        }
    }

    fn classify(&self, inputs: &ChangeInputs<'_>, ctx: &DetectionContext<'_>) -> Result<String> {
        match self {
            ClassificationMethod::PolynomialRegression => {
                Ok(super::polynomial_regression::classify_polynomial(inputs, ctx))
            }
            ClassificationMethod::LinearRegression => {
                super::linear_regression::classify_linear(inputs, ctx)
            }
            ClassificationMethod::FastCheck => super::fast_check::classify_fast(inputs, ctx),
        }
    }
}

/// Sampled differences between the models of one uid
#[derive(Debug, Clone)]
pub struct ChangeInputs<'a> {
    pub uid: &'a str,
    pub baseline: ModelRecord,
    pub target: ModelRecord,
    pub baseline_linear: ModelRecord,
    pub target_linear: ModelRecord,
    /// Abscissas of the baseline best model
    pub x: Vec<f64>,
    /// Ordinates of the baseline best model
    pub baseline_y: Vec<f64>,
    /// Target minus baseline of the best models
    pub abs_error: Vec<f64>,
    /// Target minus baseline of the linear models
    pub lin_abs_error: Vec<f64>,
}

impl<'a> ChangeInputs<'a> {
    /// Sample all four models and subtract the curves
    pub fn new(
        uid: &'a str,
        baseline: ModelRecord,
        target: ModelRecord,
        baseline_linear: ModelRecord,
        target_linear: ModelRecord,
        samples: usize,
    ) -> Self {
        let baseline_curve = get_function_values(&baseline, samples);
        let target_curve = get_function_values(&target, samples);
        let baseline_linear_curve = get_function_values(&baseline_linear, samples);
        let target_linear_curve = get_function_values(&target_linear, samples);

        Self {
            uid,
            abs_error: subtract(&target_curve.y, &baseline_curve.y),
            lin_abs_error: subtract(&target_linear_curve.y, &baseline_linear_curve.y),
            x: baseline_curve.x,
            baseline_y: baseline_curve.y,
            baseline,
            target,
            baseline_linear,
            target_linear,
        }
    }

    /// Mean of the pointwise relative errors of the best models, in percent
    pub fn relative_error_percent(&self) -> f64 {
        let relative: Vec<f64> = self
            .abs_error
            .iter()
            .zip(self.baseline_y.iter())
            .map(|(err, base)| finite_or_zero(safe_division(*err, *base)))
            .collect();
        finite_or_zero(mean(&relative) * 100.0)
    }

    /// Both coefficients within `tolerance` of the baseline ones
    pub fn coefficients_unchanged(&self, tolerance: f64) -> bool {
        let baseline_b1 = self.baseline.b1().unwrap_or(0.0);
        let target_b1 = self.target.b1().unwrap_or(0.0);
        let diff_b0 = self.target.b0() - self.baseline.b0();
        let diff_b1 = target_b1 - baseline_b1;
        diff_b0.abs() <= (tolerance * self.baseline.b0()).abs()
            && diff_b1.abs() <= (tolerance * baseline_b1).abs()
    }
}

fn subtract(target: &[f64], baseline: &[f64]) -> Vec<f64> {
    target
        .iter()
        .zip(baseline.iter())
        .map(|(t, b)| t - b)
        .collect()
}

/// Compare the best parametric models of two profiles
pub fn general_detection(
    baseline: &Profile,
    target: &Profile,
    ctx: &DetectionContext<'_>,
    method: ClassificationMethod,
) -> CheckReport {
    let mut report = CheckReport::new(method.strategy_name());
    let linear = ModelFilter::by_kind(ModelKind::Linear);
    let best_baseline = select_entries(baseline, ModelGroup::Param, ModelFilter::BestRSquare);
    let best_target = select_entries(target, ModelGroup::Param, ModelFilter::BestRSquare);
    let linear_baseline = select_entries(baseline, ModelGroup::Param, linear);
    let linear_target = select_entries(target, ModelGroup::Param, linear);

    for (uid, target_entry) in &best_target {
        let (Some(baseline_entry), Some(baseline_lin), Some(target_lin)) = (
            best_baseline.get(uid),
            linear_baseline.get(uid),
            linear_target.get(uid),
        ) else {
            debug!(uid = %uid, "Location lacks a model on one side");
            continue;
        };

        let entries = [*baseline_entry, *target_entry, *baseline_lin, *target_lin];
        match detect_change(uid, entries, ctx, method) {
            Ok(info) => report.push(info),
            Err(err) => {
                warn!(uid = %uid, error = %err, "Skipping location");
                report.skip(uid.as_str(), err.to_string());
            }
        }
    }

    if ctx.config.report_missing {
        let baseline_uids: BTreeSet<String> = best_baseline.keys().cloned().collect();
        let target_uids: BTreeSet<String> = best_target.keys().cloned().collect();
        report_missing_locations(&mut report, &baseline_uids, &target_uids);
    }
    report
}

fn detect_change(
    uid: &str,
    [baseline, target, baseline_linear, target_linear]: [&ModelEntry; 4],
    ctx: &DetectionContext<'_>,
    method: ClassificationMethod,
) -> Result<DegradationInfo> {
    let inputs = ChangeInputs::new(
        uid,
        create_model_record(baseline)?,
        create_model_record(target)?,
        create_model_record(baseline_linear)?,
        create_model_record(target_linear)?,
        ctx.samples(),
    );
    let thresholds = &ctx.config.thresholds;
    let rel_error = inputs.relative_error_percent();

    let (change, change_type) = if inputs.coefficients_unchanged(thresholds.coefficient_tolerance) {
        (PerformanceChange::NoChange, String::new())
    } else {
        let label = method.classify(&inputs, ctx)?;
        let error_sum = finite_or_zero(inputs.abs_error.iter().sum());
        let limit = thresholds.change_rate_percent;
        let change = if error_sum > 0.0 {
            if rel_error > limit {
                PerformanceChange::Degradation
            } else {
                PerformanceChange::MaybeDegradation
            }
        } else if rel_error < -limit {
            PerformanceChange::Optimization
        } else {
            PerformanceChange::MaybeOptimization
        };
        (change, label)
    };
    debug!(uid, change = %change, change_type = %change_type, rate = rel_error, "Classified change");

    let confidence = inputs.baseline.r_square.min(inputs.target.r_square);
    Ok(DegradationInfo::new(
        change,
        uid,
        inputs.baseline.kind.as_str(),
        inputs.target.kind.as_str(),
    )
    .with_type(change_type)
    .with_rate(rel_error)
    .with_confidence("r_square", confidence))
}
