//! Regression fitting used when the detector needs fresh models
//!
//! Two entry points are needed: re-fitting parametric models over a profile
//! (fast check and the quadratic upgrade of the linear-regression check) and
//! recomputing a regressogram with a different bucket count (bucket
//! reconciliation). Both live behind [`ModelFitter`] so callers can plug in
//! another fitting backend.

use crate::curve::evaluate;
use crate::error::{CheckError, Result};
use crate::model::{ModelKind, ModelRecord};
use crate::numeric::{linear_regression, mean, polyfit, round_to};
use crate::profile::{ModelEntry, Profile};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Fewest points a uid needs before any model is fitted
pub const MIN_POINTS_COUNT: usize = 3;

/// Default column of the independent variable
pub const DEFAULT_PER_KEY: &str = "structure-unit-size";

/// Default column of the dependent variable
pub const DEFAULT_OF_KEY: &str = "amount";

/// Which parametric models to fit and which columns to fit them over
#[derive(Debug, Clone, PartialEq)]
pub struct FitConfig {
    pub models: Vec<ModelKind>,
    pub per_key: String,
    pub of_key: String,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            models: ModelKind::PARAMETRIC.to_vec(),
            per_key: DEFAULT_PER_KEY.to_string(),
            of_key: DEFAULT_OF_KEY.to_string(),
        }
    }
}

/// Statistic computed per regressogram bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatisticFunction {
    #[default]
    Mean,
    Median,
}

impl FromStr for StatisticFunction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mean" => Ok(StatisticFunction::Mean),
            "median" => Ok(StatisticFunction::Median),
            other => Err(format!("unknown statistic function '{}'", other)),
        }
    }
}

impl fmt::Display for StatisticFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatisticFunction::Mean => f.write_str("mean"),
            StatisticFunction::Median => f.write_str("median"),
        }
    }
}

/// Parameters of a regressogram computation
#[derive(Debug, Clone, PartialEq)]
pub struct RegressogramConfig {
    pub bucket_number: usize,
    pub per_key: String,
    pub of_key: String,
    pub statistic_function: StatisticFunction,
}

impl Default for RegressogramConfig {
    fn default() -> Self {
        Self {
            bucket_number: 10,
            per_key: DEFAULT_PER_KEY.to_string(),
            of_key: DEFAULT_OF_KEY.to_string(),
            statistic_function: StatisticFunction::Mean,
        }
    }
}

/// Backend producing models from raw resources
pub trait ModelFitter {
    /// Fit the configured parametric models for every uid of the profile
    ///
    /// Returns a copy of the profile whose models are the fitted ones.
    fn fit_profile(&self, profile: &Profile, config: &FitConfig) -> Result<Profile>;

    /// Compute a regressogram for every uid of the profile
    fn regressogram(&self, profile: &Profile, config: &RegressogramConfig)
        -> Result<Vec<ModelEntry>>;
}

/// Ordinary least squares over transformed coordinates
#[derive(Debug, Clone, Copy, Default)]
pub struct LeastSquaresFitter;

impl ModelFitter for LeastSquaresFitter {
    fn fit_profile(&self, profile: &Profile, config: &FitConfig) -> Result<Profile> {
        let mut models = Vec::new();
        for uid in profile.resource_uids() {
            let (xs, ys) = profile.points_of(uid, &config.per_key, &config.of_key);
            if xs.len() < MIN_POINTS_COUNT {
                debug!(uid, points = xs.len(), "Too few points to fit models");
                continue;
            }
            let (x_start, x_end) = bounds(&xs);
            for &kind in &config.models {
                match fit_model(kind, &xs, &ys) {
                    Some((coeffs, r_square)) => models.push(ModelEntry::parametric(
                        uid, kind, r_square, &coeffs, x_start, x_end,
                    )),
                    None => debug!(uid, model = %kind, "Model cannot be fitted to the data"),
                }
            }
        }

        if models.is_empty() {
            return Err(CheckError::Fit(format!(
                "no model could be fitted (requested: {})",
                config
                    .models
                    .iter()
                    .map(ModelKind::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }

        let mut fitted = profile.clone();
        fitted.models = models;
        Ok(fitted)
    }

    fn regressogram(
        &self,
        profile: &Profile,
        config: &RegressogramConfig,
    ) -> Result<Vec<ModelEntry>> {
        if config.bucket_number == 0 {
            return Err(CheckError::Fit("regressogram needs at least one bucket".into()));
        }
        let mut entries = Vec::new();
        for uid in profile.resource_uids() {
            let (xs, ys) = profile.points_of(uid, &config.per_key, &config.of_key);
            if xs.is_empty() {
                continue;
            }
            let (x_start, x_end) = bounds(&xs);
            let (buckets, r_square) = binned_statistic(
                &xs,
                &ys,
                (x_start, x_end),
                config.bucket_number,
                config.statistic_function,
            );

            let mut entry = ModelEntry::nonparametric(
                uid,
                ModelKind::Regressogram,
                r_square,
                buckets,
                x_start,
                x_end,
            );
            entry.per_key = Some(config.per_key.clone());
            entry.of_key = Some(config.of_key.clone());
            entry.statistic_function = Some(config.statistic_function.to_string());
            entries.push(entry);
        }
        Ok(entries)
    }
}

fn bounds(xs: &[f64]) -> (f64, f64) {
    xs.iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| (lo.min(x), hi.max(x)))
}

/// Coefficients and r² of one parametric model, `None` if the data do not allow it
pub fn fit_model(kind: ModelKind, xs: &[f64], ys: &[f64]) -> Option<(Vec<f64>, f64)> {
    let coeffs = match kind {
        ModelKind::Constant => vec![mean(ys)],
        ModelKind::Linear => {
            let fit = linear_regression(xs, ys)?;
            vec![fit.intercept, fit.slope]
        }
        ModelKind::Logarithmic => {
            if xs.iter().any(|&x| x <= 0.0) {
                return None;
            }
            let log_x: Vec<f64> = xs.iter().map(|x| x.ln()).collect();
            let fit = linear_regression(&log_x, ys)?;
            vec![fit.intercept, fit.slope]
        }
        ModelKind::Quadratic => polyfit(xs, ys, 2)?.coefficients,
        ModelKind::Power => {
            if xs.iter().chain(ys.iter()).any(|&v| v <= 0.0) {
                return None;
            }
            let log_x: Vec<f64> = xs.iter().map(|x| x.ln()).collect();
            let log_y: Vec<f64> = ys.iter().map(|y| y.ln()).collect();
            let fit = linear_regression(&log_x, &log_y)?;
            vec![fit.intercept.exp(), fit.slope]
        }
        ModelKind::Exponential => {
            if ys.iter().any(|&y| y <= 0.0) {
                return None;
            }
            let log_y: Vec<f64> = ys.iter().map(|y| y.ln()).collect();
            let fit = linear_regression(xs, &log_y)?;
            vec![fit.intercept.exp(), fit.slope.exp()]
        }
        _ => return None,
    };

    if coeffs.iter().any(|c| !c.is_finite()) {
        return None;
    }
    let record = ModelRecord::parametric(
        kind,
        0.0,
        coeffs[0],
        coeffs.get(1).copied().unwrap_or(0.0),
        coeffs.get(2).copied().unwrap_or(0.0),
    );
    let predicted: Vec<f64> = xs
        .iter()
        .map(|&x| evaluate(&record, x))
        .collect();
    Some((coeffs, r_square(ys, &predicted)))
}

/// Coefficient of determination, clamped to `[0, 1]`
///
/// Rounded to 10 decimal places so that floating-point noise cannot reorder
/// models that fit equally well. Flat data score 1 when predicted exactly.
pub fn r_square(ys: &[f64], predicted: &[f64]) -> f64 {
    let y_mean = mean(ys);
    let ss_tot: f64 = ys.iter().map(|y| (y - y_mean).powi(2)).sum();
    let ss_res: f64 = ys
        .iter()
        .zip(predicted.iter())
        .map(|(y, p)| (y - p).powi(2))
        .sum();

    let scale = ys.iter().map(|y| y * y).sum::<f64>().max(f64::MIN_POSITIVE);
    let value = if ss_tot <= scale * 1e-24 {
        if ss_res <= scale * 1e-24 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - ss_res / ss_tot
    };
    if value.is_finite() {
        round_to(value.clamp(0.0, 1.0), 10)
    } else {
        0.0
    }
}

/// Per-bucket statistic over equal-width buckets and r² of the step function
///
/// Empty buckets hold 0. The last bucket includes the right edge.
fn binned_statistic(
    xs: &[f64],
    ys: &[f64],
    (x_start, x_end): (f64, f64),
    bucket_number: usize,
    statistic: StatisticFunction,
) -> (Vec<f64>, f64) {
    let width = (x_end - x_start) / bucket_number as f64;
    let bucket_of = |x: f64| -> usize {
        if width <= 0.0 {
            return 0;
        }
        (((x - x_start) / width).floor().max(0.0) as usize).min(bucket_number - 1)
    };

    let mut members: Vec<Vec<f64>> = vec![Vec::new(); bucket_number];
    for (&x, &y) in xs.iter().zip(ys.iter()) {
        members[bucket_of(x)].push(y);
    }

    let buckets: Vec<f64> = members
        .iter_mut()
        .map(|values| match statistic {
            _ if values.is_empty() => 0.0,
            StatisticFunction::Mean => mean(values),
            StatisticFunction::Median => median(values),
        })
        .collect();

    let predicted: Vec<f64> = xs.iter().map(|&x| buckets[bucket_of(x)]).collect();
    let r2 = r_square(ys, &predicted);
    (buckets, r2)
}

/// Median of the bucket members in `f64`
///
/// aprender's `DescriptiveStats::quantile` works on `f32` vectors; bucket
/// values feed back into profile models and keep full precision here.
fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}
