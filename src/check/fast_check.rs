// Fast check classification
//
// Fits every parametric model to the difference of the best models and
// labels the change with the type of the best fitting one.

use super::general_detection::{general_detection, ChangeInputs, ClassificationMethod};
use super::Checker;
use crate::detection::DetectionContext;
use crate::error::{CheckError, Result};
use crate::fitting::FitConfig;
use crate::profile::{ModelGroup, Profile};
use crate::report::CheckReport;
use crate::selector::{select_entries, ModelFilter};

/// Fast check strategy
#[derive(Debug, Clone, Copy, Default)]
pub struct FastCheck;

impl Checker for FastCheck {
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
            ClassificationMethod::FastCheck,
        ))
    }
}

/// Uppercased type of the model best describing the difference
pub fn classify_fast(inputs: &ChangeInputs<'_>, ctx: &DetectionContext<'_>) -> Result<String> {
    let refit = Profile::synthetic(
        inputs.uid,
        &inputs.x,
        &inputs.abs_error,
        &FitConfig::default(),
        ctx.fitter,
    )?;
    select_entries(&refit, ModelGroup::Param, ModelFilter::BestRSquare)
        .get(inputs.uid)
        .map(|entry| entry.model.to_uppercase())
        .ok_or_else(|| CheckError::Fit(format!("no model describes the change of '{}'", inputs.uid)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CheckConfig;
    use crate::model::{ModelKind, ModelRecord};

    fn linear(b0: f64, b1: f64) -> ModelRecord {
        ModelRecord::parametric(ModelKind::Linear, 0.95, b0, b1, 0.0).with_interval(0.0, 100.0)
    }

    #[test]
    fn test_constant_shift() {
        let config = CheckConfig::default();
        let ctx = DetectionContext::new(&config);
        let inputs = ChangeInputs::new(
            "f",
            linear(10.0, 2.0),
            linear(30.0, 2.0),
            linear(10.0, 2.0),
            linear(30.0, 2.0),
            100,
        );
        assert_eq!(classify_fast(&inputs, &ctx).unwrap(), "CONSTANT");
    }

    #[test]
    fn test_quadratic_growth() {
        let config = CheckConfig::default();
        let ctx = DetectionContext::new(&config);
        let baseline =
            ModelRecord::parametric(ModelKind::Quadratic, 0.95, 1.0, -3.0, 0.0).with_interval(0.0, 10.0);
        let target =
            ModelRecord::parametric(ModelKind::Quadratic, 0.95, 1.0, 0.0, 1.0).with_interval(0.0, 10.0);
        let inputs = ChangeInputs::new("f", baseline, target, linear(1.0, 1.0), linear(1.0, 2.0), 50);
        // x² + 3x is fitted best by the quadratic model
        assert_eq!(classify_fast(&inputs, &ctx).unwrap(), "QUADRATIC");
    }

    #[test]
    fn test_empty_difference_fails() {
        let config = CheckConfig::default();
        let ctx = DetectionContext::new(&config);
        let inputs = ChangeInputs::new(
            "f",
            linear(10.0, 2.0),
            linear(30.0, 2.0),
            linear(10.0, 2.0),
            linear(30.0, 2.0),
            2,
        );
        assert!(classify_fast(&inputs, &ctx).is_err());
    }
}
