//! Orchestration of model-pair comparisons
//!
//! Selects the models of both profiles, pairs them per uid, runs a pair
//! analysis and turns its outcome into [`DegradationInfo`] records. A uid
//! whose evaluation fails is logged and reported as skipped instead of
//! aborting the run.

use crate::change::{ChangeResult, DegradationInfo, PerformanceChange};
use crate::check::{CheckMethod, Checker};
use crate::config::CheckConfig;
use crate::error::Result;
use crate::fitting::{LeastSquaresFitter, ModelFitter};
use crate::model::{create_model_record, ModelRecord};
use crate::numeric::round_to;
use crate::profile::{ModelEntry, Profile};
use crate::report::CheckReport;
use crate::selector::{location_of, select_entries, ModelsStrategy};
use crate::strategy::get_strategies_for;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Everything a strategy needs besides the two profiles
#[derive(Clone, Copy)]
pub struct DetectionContext<'a> {
    pub config: &'a CheckConfig,
    pub fitter: &'a dyn ModelFitter,
}

impl<'a> DetectionContext<'a> {
    /// Context using the built-in least-squares fitter
    pub fn new(config: &'a CheckConfig) -> Self {
        Self {
            config,
            fitter: &LeastSquaresFitter,
        }
    }

    pub fn with_fitter(mut self, fitter: &'a dyn ModelFitter) -> Self {
        self.fitter = fitter;
        self
    }

    pub fn samples(&self) -> usize {
        self.config.samples
    }
}

/// Analysis of one baseline/target model pair
pub type PairAnalysis = fn(
    uid: &str,
    baseline: &ModelRecord,
    target: &ModelRecord,
    target_profile: &Profile,
    ctx: &DetectionContext<'_>,
) -> Result<ChangeResult>;

/// Run a pair analysis over the models paired by the configured models strategy
///
/// Composite models strategies run their components one after another.
pub fn run_detection_with_strategy(
    strategy: &str,
    analysis: PairAnalysis,
    baseline: &Profile,
    target: &Profile,
    ctx: &DetectionContext<'_>,
) -> CheckReport {
    let mut report = CheckReport::new(strategy);
    for models_strategy in ctx.config.models_strategy.components() {
        detect_with_models_strategy(&mut report, models_strategy, analysis, baseline, target, ctx);
    }
    report
}

fn detect_with_models_strategy(
    report: &mut CheckReport,
    models_strategy: ModelsStrategy,
    analysis: PairAnalysis,
    baseline: &Profile,
    target: &Profile,
    ctx: &DetectionContext<'_>,
) {
    let (group, filter) = models_strategy.selection();
    let keyed_by_type = models_strategy.keys_by_type();
    let baseline_models = select_entries(baseline, group, filter);
    let target_models = select_entries(target, group, filter);
    debug!(
        models_strategy = %models_strategy,
        baseline = baseline_models.len(),
        target = target_models.len(),
        "Selected models"
    );

    for (key, target_entry) in &target_models {
        let Some(baseline_entry) = baseline_models.get(key) else {
            continue;
        };
        let location = location_of(key, &target_entry.model, keyed_by_type);

        match compare_pair(key, &location, baseline_entry, target_entry, analysis, target, ctx) {
            Ok(Some(info)) => report.push(info),
            Ok(None) => {}
            Err(err) => {
                warn!(uid = %location, error = %err, "Skipping location");
                report.skip(location, err.to_string());
            }
        }
    }

    if ctx.config.report_missing {
        let locations = |models: &BTreeMap<String, &ModelEntry>| -> BTreeSet<String> {
            models
                .iter()
                .map(|(key, entry)| location_of(key, &entry.model, keyed_by_type))
                .collect()
        };
        report_missing_locations(report, &locations(&baseline_models), &locations(&target_models));
    }
}

fn compare_pair(
    key: &str,
    location: &str,
    baseline_entry: &ModelEntry,
    target_entry: &ModelEntry,
    analysis: PairAnalysis,
    target: &Profile,
    ctx: &DetectionContext<'_>,
) -> Result<Option<DegradationInfo>> {
    let baseline_model = create_model_record(baseline_entry)?;
    let target_model = create_model_record(target_entry)?;

    let confidence = round_to(baseline_model.r_square.min(target_model.r_square), 2);
    if confidence < ctx.config.min_confidence {
        debug!(uid = location, confidence, "Models too unreliable to compare");
        return Ok(None);
    }

    let result = analysis(key, &baseline_model, &target_model, target, ctx)?;
    debug!(uid = location, change = %result.change, rate = result.rel_error, "Compared models");

    Ok(Some(
        DegradationInfo::new(
            result.change,
            location,
            baseline_model.kind.as_str(),
            target_model.kind.as_str(),
        )
        .with_rate(result.rel_error)
        .with_confidence("r_square", confidence)
        .with_partial_intervals(result.partial_intervals),
    ))
}

/// Emit `NotInTarget` / `NotInBaseline` records for one-sided locations
pub fn report_missing_locations(
    report: &mut CheckReport,
    baseline: &BTreeSet<String>,
    target: &BTreeSet<String>,
) {
    for location in baseline.difference(target) {
        report.push(DegradationInfo::new(
            PerformanceChange::NotInTarget,
            location.as_str(),
            "-",
            "-",
        ));
    }
    for location in target.difference(baseline) {
        report.push(DegradationInfo::new(
            PerformanceChange::NotInBaseline,
            location.as_str(),
            "-",
            "-",
        ));
    }
}

/// Run the given strategies over a profile pair
pub fn check_profiles(
    baseline: &Profile,
    target: &Profile,
    methods: &[CheckMethod],
    ctx: &DetectionContext<'_>,
) -> Result<Vec<CheckReport>> {
    methods
        .iter()
        .map(|method| {
            let report = method.check(baseline, target, ctx)?;
            info!(
                strategy = method.name(),
                records = report.degradations.len(),
                skipped = report.skipped.len(),
                "Detection finished"
            );
            Ok(report)
        })
        .collect()
}

/// Run every strategy the configuration rules select for the baseline profile
pub fn degradation_between_profiles(
    baseline: &Profile,
    target: &Profile,
    ctx: &DetectionContext<'_>,
) -> Result<Vec<CheckReport>> {
    let methods = get_strategies_for(baseline, ctx.config)?;
    check_profiles(baseline, target, &methods, ctx)
}
