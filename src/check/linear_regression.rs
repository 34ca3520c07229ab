// Linear regression classification
//
// Runs ordinary least squares over the difference of the linear models.
// A flat fit whose intercept matches the change of b0 is a constant change,
// a fit whose slope matches the change of b1 is a linear change. The
// difference is then refitted with every parametric model: a clearly better
// quadratic fit upgrades the label, and without any label the best refitted
// model names the change.

use super::general_detection::{general_detection, ChangeInputs, ClassificationMethod};
use super::Checker;
use crate::detection::DetectionContext;
use crate::error::{CheckError, Result};
use crate::fitting::FitConfig;
use crate::model::ModelKind;
use crate::numeric::{
    abs_in_absolute_range, abs_in_relative_range, linear_regression, LinearFit,
};
use crate::profile::{ModelGroup, Profile};
use crate::report::CheckReport;
use crate::selector::{select_entries, ModelFilter};
use tracing::debug;

/// Linear regression strategy
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearRegression;

impl Checker for LinearRegression {
    fn check(
        &self,
        baseline: &Profile,
        target: &Profile,
        ctx: &DetectionContext<'_>,
    ) -> Result<CheckReport> {
        Ok(general_detection(
            baseline,
            target,
            ctx,
            ClassificationMethod::LinearRegression,
        ))
    }
}

/// Largest gap between the b0 change and the fitted intercept still
/// counted as equal for a linear or constant baseline
const INTERCEPT_EPSILON: f64 = 1e-12;

/// Flat fit whose intercept matches the change of b0
///
/// A linear or constant baseline additionally needs the intercept to equal
/// the change of b0 up to [`INTERCEPT_EPSILON`].
pub fn is_constant_change(
    baseline_kind: ModelKind,
    fit: &LinearFit,
    diff_b0: f64,
    threshold: f64,
    intercept_tolerance: f64,
) -> bool {
    let flat = abs_in_absolute_range(fit.slope, threshold)
        && abs_in_relative_range(diff_b0, fit.intercept, intercept_tolerance);
    match baseline_kind {
        ModelKind::Linear | ModelKind::Constant => {
            flat && (diff_b0 - fit.intercept).abs() < INTERCEPT_EPSILON
        }
        _ => flat,
    }
}

/// Shape of the difference between the linear models
pub fn classify_linear(inputs: &ChangeInputs<'_>, ctx: &DetectionContext<'_>) -> Result<String> {
    let thresholds = &ctx.config.thresholds;
    let fit = linear_regression(&inputs.x, &inputs.lin_abs_error)
        .ok_or_else(|| CheckError::Fit(format!("too few samples for '{}'", inputs.uid)))?;

    let diff_b0 = inputs.target.b0() - inputs.baseline.b0();
    let diff_lin_b1 = inputs.target_linear.b1().unwrap_or(0.0)
        - inputs.baseline_linear.b1().unwrap_or(0.0);
    let max_error = inputs
        .abs_error
        .iter()
        .fold(0.0_f64, |acc, err| acc.max(err.abs()));
    let threshold = thresholds.coefficient_tolerance * max_error;

    let mut label = if is_constant_change(
        inputs.baseline.kind,
        &fit,
        diff_b0,
        threshold,
        thresholds.intercept_tolerance,
    ) {
        Some(ModelKind::Constant)
    } else if abs_in_relative_range(diff_lin_b1, fit.slope, thresholds.gradient_tolerance)
        && fit.r_square() > thresholds.linear_r_square
    {
        Some(ModelKind::Linear)
    } else {
        None
    };
    debug!(
        uid = inputs.uid,
        slope = fit.slope,
        intercept = fit.intercept,
        "Linear fit of the difference"
    );

    let refit = Profile::synthetic(
        inputs.uid,
        &inputs.x,
        &inputs.lin_abs_error,
        &FitConfig::default(),
        ctx.fitter,
    )?;
    let r_square_of = |kind: ModelKind| {
        refit
            .get_model_of(kind, inputs.uid)
            .map_or(0.0, |entry| entry.r_square)
    };
    let quadratic_r_square = r_square_of(ModelKind::Quadratic);
    if quadratic_r_square > thresholds.quadratic_r_square
        && quadratic_r_square - r_square_of(ModelKind::Linear) > thresholds.r_square_margin
    {
        label = Some(ModelKind::Quadratic);
    }

    if let Some(kind) = label {
        return Ok(kind.as_str().to_string());
    }
    let best = select_entries(&refit, ModelGroup::Param, ModelFilter::BestRSquare);
    Ok(best
        .get(inputs.uid)
        .map_or_else(String::new, |entry| entry.model.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CheckConfig;
    use crate::model::ModelRecord;

    fn linear(b0: f64, b1: f64) -> ModelRecord {
        ModelRecord::parametric(ModelKind::Linear, 0.95, b0, b1, 0.0).with_interval(0.0, 100.0)
    }

    fn quadratic(b0: f64, b1: f64, b2: f64) -> ModelRecord {
        ModelRecord::parametric(ModelKind::Quadratic, 0.95, b0, b1, b2).with_interval(0.0, 100.0)
    }

    #[test]
    fn test_shifted_line_is_constant() {
        let config = CheckConfig::default();
        let ctx = DetectionContext::new(&config);
        let inputs = ChangeInputs::new(
            "f",
            linear(10.0, 2.0),
            linear(20.0, 2.0),
            linear(10.0, 2.0),
            linear(20.0, 2.0),
            100,
        );
        assert_eq!(classify_linear(&inputs, &ctx).unwrap(), "constant");
    }

    #[test]
    fn test_gentle_slope_within_threshold_is_constant() {
        let config = CheckConfig::default();
        let ctx = DetectionContext::new(&config);
        // error of the linear models is 1000 + x over [1, 100]
        let inputs = ChangeInputs::new(
            "f",
            quadratic(10.0, 1.0, 0.5).with_interval(1.0, 100.0),
            quadratic(1010.0, 2.0, 0.5).with_interval(1.0, 100.0),
            linear(10.0, 1.0).with_interval(1.0, 100.0),
            linear(1010.0, 2.0).with_interval(1.0, 100.0),
            100,
        );
        assert_eq!(classify_linear(&inputs, &ctx).unwrap(), "constant");
    }

    #[test]
    fn test_constant_change_compares_raw_slope() {
        let fit = LinearFit {
            slope: 1.0,
            intercept: 1000.0,
            r_value: 1.0,
        };
        assert!(is_constant_change(ModelKind::Quadratic, &fit, 1000.0, 55.0, 0.05));
        assert!(is_constant_change(ModelKind::Quadratic, &fit, 980.0, 55.0, 0.05));
        assert!(!is_constant_change(ModelKind::Quadratic, &fit, 1000.0, 0.5, 0.05));
        assert!(!is_constant_change(ModelKind::Quadratic, &fit, 900.0, 55.0, 0.05));
    }

    #[test]
    fn test_linear_baseline_needs_exact_intercept() {
        let fit = LinearFit {
            slope: 0.0,
            intercept: 10.0,
            r_value: 0.0,
        };
        assert!(is_constant_change(ModelKind::Linear, &fit, 10.0, 1.0, 0.05));
        assert!(is_constant_change(ModelKind::Constant, &fit, 10.0, 1.0, 0.05));
        assert!(!is_constant_change(ModelKind::Linear, &fit, 10.2, 1.0, 0.05));
        assert!(!is_constant_change(ModelKind::Constant, &fit, 10.2, 1.0, 0.05));
        assert!(is_constant_change(ModelKind::Power, &fit, 10.2, 1.0, 0.05));
    }

    #[test]
    fn test_steeper_line_is_linear() {
        let config = CheckConfig::default();
        let ctx = DetectionContext::new(&config);
        let inputs = ChangeInputs::new(
            "f",
            linear(10.0, 2.0),
            linear(10.0, 6.0),
            linear(10.0, 2.0),
            linear(10.0, 6.0),
            100,
        );
        assert_eq!(classify_linear(&inputs, &ctx).unwrap(), "linear");
    }

    #[test]
    fn test_growing_curvature_is_quadratic() {
        let config = CheckConfig::default();
        let ctx = DetectionContext::new(&config);
        let inputs = ChangeInputs::new(
            "f",
            quadratic(10.0, 1.0, 0.0),
            quadratic(10.0, 1.0, 0.5),
            quadratic(10.0, 1.0, 0.0),
            quadratic(10.0, 1.0, 0.5),
            100,
        );
        assert_eq!(classify_linear(&inputs, &ctx).unwrap(), "quadratic");
    }

    #[test]
    fn test_too_few_samples_fail() {
        let config = CheckConfig {
            samples: 1,
            ..CheckConfig::default()
        };
        let ctx = DetectionContext::new(&config);
        let inputs = ChangeInputs::new(
            "f",
            linear(10.0, 2.0),
            linear(10.0, 6.0),
            linear(10.0, 2.0),
            linear(10.0, 6.0),
            ctx.samples(),
        );
        assert!(matches!(classify_linear(&inputs, &ctx), Err(CheckError::Fit(_))));
    }
}
