// Best model order equality
//
// Ranks the best parametric model of each uid by complexity. When both
// sides fit well enough and the ranks differ, a more complex target model
// is a degradation and a simpler one an optimization.

use super::Checker;
use crate::change::{DegradationInfo, PerformanceChange};
use crate::detection::{report_missing_locations, DetectionContext};
use crate::error::Result;
use crate::model::ModelKind;
use crate::profile::{ModelEntry, ModelGroup, Profile};
use crate::report::CheckReport;
use crate::selector::{select_entries, ModelFilter};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Parametric model types from the simplest to the most complex
pub const MODEL_ORDERING: [ModelKind; 6] = [
    ModelKind::Constant,
    ModelKind::Logarithmic,
    ModelKind::Linear,
    ModelKind::Quadratic,
    ModelKind::Power,
    ModelKind::Exponential,
];

/// Best model order equality strategy
#[derive(Debug, Clone, Copy, Default)]
pub struct BestModelOrderEquality;

impl Checker for BestModelOrderEquality {
    fn check(
        &self,
        baseline: &Profile,
        target: &Profile,
        ctx: &DetectionContext<'_>,
    ) -> Result<CheckReport> {
        let mut report = CheckReport::new("best_model_order_equality");
        let best_baseline = select_entries(baseline, ModelGroup::Param, ModelFilter::BestRSquare);
        let best_target = select_entries(target, ModelGroup::Param, ModelFilter::BestRSquare);
        let min_confidence = ctx.config.thresholds.bmoe_confidence;

        for (uid, target_entry) in &best_target {
            let Some(baseline_entry) = best_baseline.get(uid) else {
                continue;
            };
            let confidence = baseline_entry.r_square.min(target_entry.r_square);
            let change = compare_order(baseline_entry, target_entry, confidence, min_confidence);
            debug!(uid = %uid, change = %change, confidence, "Compared best model order");

            report.push(
                DegradationInfo::new(
                    change,
                    uid.as_str(),
                    baseline_entry.model.as_str(),
                    target_entry.model.as_str(),
                )
                .with_type("order")
                .with_confidence("r_square", confidence),
            );
        }

        if ctx.config.report_missing {
            let uids = |models: &BTreeMap<String, &ModelEntry>| -> BTreeSet<String> {
                models.keys().cloned().collect()
            };
            report_missing_locations(&mut report, &uids(&best_baseline), &uids(&best_target));
        }
        Ok(report)
    }
}

/// Position of a model type in [`MODEL_ORDERING`]
pub fn model_rank(model: &str) -> Option<usize> {
    let kind = model.parse::<ModelKind>().ok()?;
    MODEL_ORDERING.iter().position(|&ranked| ranked == kind)
}

fn compare_order(
    baseline: &ModelEntry,
    target: &ModelEntry,
    confidence: f64,
    min_confidence: f64,
) -> PerformanceChange {
    if confidence < min_confidence {
        return PerformanceChange::NoChange;
    }
    match (model_rank(&baseline.model), model_rank(&target.model)) {
        (Some(from), Some(to)) if from < to => PerformanceChange::Degradation,
        (Some(from), Some(to)) if from > to => PerformanceChange::Optimization,
        (Some(_), Some(_)) => PerformanceChange::NoChange,
        _ => PerformanceChange::Unknown,
    }
}
