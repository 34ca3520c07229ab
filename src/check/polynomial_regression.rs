// Polynomial regression classification
//
// Fits polynomials of increasing degree to the difference of the linear
// models until the residual sum of squares drops under the configured
// threshold. The degree that first fits names the shape of the change.

use super::general_detection::{general_detection, ChangeInputs, ClassificationMethod};
use super::Checker;
use crate::detection::DetectionContext;
use crate::error::Result;
use crate::numeric::polyfit;
use crate::profile::Profile;
use crate::report::CheckReport;
use tracing::debug;

/// Highest polynomial degree tried
pub const MAX_DEGREE: usize = 4;

/// Polynomial regression strategy
#[derive(Debug, Clone, Copy, Default)]
pub struct PolynomialRegression;

impl Checker for PolynomialRegression {
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
            ClassificationMethod::PolynomialRegression,
        ))
    }
}

/// Label of a polynomial degree
pub fn degree_label(degree: usize) -> &'static str {
    match degree {
        0 => "constant",
        1 => "linear",
        2 => "quadratic",
        _ => "unknown",
    }
}

/// Lowest degree whose fit of the points stays under `residual_threshold`
///
/// Falls back to [`MAX_DEGREE`] when no degree fits well enough.
pub fn fitting_degree(x: &[f64], y: &[f64], residual_threshold: f64) -> usize {
    (0..=MAX_DEGREE)
        .find(|&degree| {
            polyfit(x, y, degree).is_some_and(|fit| fit.residual < residual_threshold)
        })
        .unwrap_or(MAX_DEGREE)
}

/// Shape of the difference between the linear models
pub fn classify_polynomial(inputs: &ChangeInputs<'_>, ctx: &DetectionContext<'_>) -> String {
    let degree = fitting_degree(
        &inputs.x,
        &inputs.lin_abs_error,
        ctx.config.thresholds.polynomial_residual,
    );
    debug!(uid = inputs.uid, degree, "Polynomial fit of the difference");
    degree_label(degree).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CheckConfig;
    use crate::model::{ModelKind, ModelRecord};
    use crate::numeric::linspace;

    fn linear(b0: f64, b1: f64) -> ModelRecord {
        ModelRecord::parametric(ModelKind::Linear, 0.95, b0, b1, 0.0).with_interval(0.0, 100.0)
    }

    #[test]
    fn test_degree_labels() {
        assert_eq!(degree_label(0), "constant");
        assert_eq!(degree_label(1), "linear");
        assert_eq!(degree_label(2), "quadratic");
        assert_eq!(degree_label(3), "unknown");
    }

    #[test]
    fn test_fitting_degree_of_shapes() {
        let x = linspace(0.0, 100.0, 200);
        let flat: Vec<f64> = x.iter().map(|_| 5.0).collect();
        let line: Vec<f64> = x.iter().map(|v| 3.0 + 2.0 * v).collect();
        let parabola: Vec<f64> = x.iter().map(|v| 1.0 + 50.0 * v * v).collect();

        assert_eq!(fitting_degree(&x, &flat, 1e-6), 0);
        assert_eq!(fitting_degree(&x, &line, 1e-6), 1);
        assert_eq!(fitting_degree(&x, &parabola, 1e-3), 2);
    }

    #[test]
    fn test_small_difference_is_constant() {
        let config = CheckConfig::default();
        let ctx = DetectionContext::new(&config);
        let inputs = ChangeInputs::new(
            "f",
            linear(10.0, 2.0),
            linear(20.0, 4.0),
            linear(10.0, 2.0),
            linear(20.0, 4.0),
            100,
        );
        // A linear difference of slope 2 over [0, 100] deviates from its mean
        // by far less than the residual threshold.
        assert_eq!(classify_polynomial(&inputs, &ctx), "constant");
    }

    #[test]
    fn test_tight_threshold_finds_linear() {
        let config = CheckConfig {
            thresholds: crate::config::Thresholds {
                polynomial_residual: 1e-6,
                ..Default::default()
            },
            ..CheckConfig::default()
        };
        let ctx = DetectionContext::new(&config);
        let inputs = ChangeInputs::new(
            "f",
            linear(10.0, 2.0),
            linear(20.0, 4.0),
            linear(10.0, 2.0),
            linear(20.0, 4.0),
            100,
        );
        assert_eq!(classify_polynomial(&inputs, &ctx), "linear");
    }
}
