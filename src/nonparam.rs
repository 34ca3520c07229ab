//! Alignment of baseline and target models before a pointwise comparison
//!
//! Regressograms with different bucket counts are made comparable by
//! recomputing the target regressogram with the baseline's bucket count.
//! Coordinates that still differ in length are cut to the shorter prefix.

use crate::curve::{model_coordinates, Curve};
use crate::error::{CheckError, Result};
use crate::fitting::{
    ModelFitter, RegressogramConfig, StatisticFunction, DEFAULT_OF_KEY, DEFAULT_PER_KEY,
};
use crate::model::{create_model_record, ModelKind, ModelRecord};
use crate::profile::Profile;
use tracing::warn;

/// Aligned coordinates of a baseline/target model pair
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedCurves {
    /// Common domain, taken from the baseline
    pub x: Vec<f64>,
    pub baseline_y: Vec<f64>,
    pub target_y: Vec<f64>,
}

impl AlignedCurves {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Align the coordinates of two models of one uid
///
/// `uid` may carry the model type suffix of the `all-*` selections; it is
/// stripped before looking the uid up in the target profile.
///
/// # Errors
/// [`CheckError::MissingModel`] when re-bucketing needs a target regressogram
/// or resources the target profile does not hold.
pub fn preprocess_nonparam_models(
    uid: &str,
    baseline: &ModelRecord,
    target_profile: &Profile,
    target: &ModelRecord,
    fitter: &dyn ModelFitter,
    samples: usize,
) -> Result<AlignedCurves> {
    let rebucketed;
    let target = if needs_rebucketing(baseline, target) {
        rebucketed = unify_buckets(uid, baseline.coeff_size(), target_profile, target, fitter)?;
        &rebucketed
    } else {
        target
    };

    let mut baseline_curve = model_coordinates(baseline, samples);
    let mut target_curve = model_coordinates(target, samples);
    truncate_to_common_length(uid, &mut baseline_curve, &mut target_curve);

    Ok(AlignedCurves {
        x: baseline_curve.x,
        baseline_y: baseline_curve.y,
        target_y: target_curve.y,
    })
}

fn needs_rebucketing(baseline: &ModelRecord, target: &ModelRecord) -> bool {
    baseline.kind == ModelKind::Regressogram
        && target.kind == ModelKind::Regressogram
        && baseline.coeff_size() != target.coeff_size()
}

/// Recompute the target regressogram with `bucket_number` buckets
fn unify_buckets(
    uid: &str,
    bucket_number: usize,
    target_profile: &Profile,
    target: &ModelRecord,
    fitter: &dyn ModelFitter,
) -> Result<ModelRecord> {
    let plain_uid = uid.strip_suffix(ModelKind::Regressogram.as_str()).unwrap_or(uid);
    warn!(
        uid = plain_uid,
        from = target.coeff_size(),
        to = bucket_number,
        "Bucket counts differ, recomputing target regressogram"
    );

    let missing = || CheckError::MissingModel {
        uid: plain_uid.to_string(),
        kind: ModelKind::Regressogram.to_string(),
    };
    let original = target_profile
        .get_model_of(ModelKind::Regressogram, plain_uid)
        .ok_or_else(missing)?;

    let statistic_function = match original.statistic_function.as_deref() {
        Some(name) => name
            .parse::<StatisticFunction>()
            .map_err(|reason| CheckError::malformed(plain_uid, reason))?,
        None => StatisticFunction::default(),
    };
    let config = RegressogramConfig {
        bucket_number,
        per_key: original
            .per_key
            .clone()
            .unwrap_or_else(|| DEFAULT_PER_KEY.to_string()),
        of_key: original
            .of_key
            .clone()
            .unwrap_or_else(|| DEFAULT_OF_KEY.to_string()),
        statistic_function,
    };

    let entries = fitter.regressogram(target_profile, &config)?;
    let entry = entries
        .iter()
        .find(|entry| entry.uid == plain_uid)
        .ok_or_else(missing)?;
    create_model_record(entry)
}

fn truncate_to_common_length(uid: &str, baseline: &mut Curve, target: &mut Curve) {
    if baseline.len() == target.len() && baseline.x.len() == target.x.len() {
        return;
    }
    let common = baseline
        .len()
        .min(target.len())
        .min(baseline.x.len())
        .min(target.x.len());
    warn!(
        uid,
        baseline = baseline.len(),
        target = target.len(),
        common,
        "Model coordinates differ in length, truncating to the shorter one"
    );
    baseline.truncate(common);
    target.truncate(common);
}
