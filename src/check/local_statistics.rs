// Local statistics comparison
//
// Splits the aligned curves into windows and compares eight descriptive
// statistics per window. Each statistic votes on the direction of the
// change; the summed votes decide the verdict of the window. The overall
// verdict is taken from the mean relative error of all windows.

use super::Checker;
use crate::change::{classify_change, ChangeResult, PartialInterval};
use crate::config::Thresholds;
use crate::detection::{run_detection_with_strategy, DetectionContext};
use crate::error::Result;
use crate::model::ModelRecord;
use crate::nonparam::preprocess_nonparam_models;
use crate::numeric::{finite_or_zero, round_to, safe_division, simpson};
use crate::profile::Profile;
use crate::report::CheckReport;
use aprender::stats::DescriptiveStats;
use trueno::Vector;

/// Number of statistics compared per window
pub const STAT_COUNT: usize = 8;

/// Local statistics strategy
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStatistics;

impl Checker for LocalStatistics {
    fn check(
        &self,
        baseline: &Profile,
        target: &Profile,
        ctx: &DetectionContext<'_>,
    ) -> Result<CheckReport> {
        Ok(run_detection_with_strategy(
            "local_statistics",
            compute_local_statistics,
            baseline,
            target,
            ctx,
        ))
    }
}

/// Descriptive statistics of one window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub integral: f64,
    pub mean: f64,
    pub median: f64,
    pub max: f64,
    pub min: f64,
    pub sum: f64,
    pub q25: f64,
    pub q75: f64,
}

impl WindowStats {
    /// Statistics of the points of one window
    ///
    /// Vector statistics run on trueno, quantiles on aprender (R-7). Both
    /// work in `f32`; only the relative errors between windows are used,
    /// so the narrowing is accepted. The integral and sum stay in `f64`.
    pub fn compute(x: &[f64], y: &[f64]) -> Self {
        let values: Vec<f32> = y.iter().map(|&v| v as f32).collect();
        let vector = Vector::from_slice(&values);
        let stats = DescriptiveStats::new(&vector);

        Self {
            integral: simpson(x, y),
            mean: vector.mean().map_or(0.0, f64::from),
            median: stats.quantile(0.5).map_or(0.0, f64::from),
            max: vector.max().map_or(0.0, f64::from),
            min: vector.min().map_or(0.0, f64::from),
            sum: y.iter().sum(),
            q25: stats.quantile(0.25).map_or(0.0, f64::from),
            q75: stats.quantile(0.75).map_or(0.0, f64::from),
        }
    }

    fn values(&self) -> [f64; STAT_COUNT] {
        [
            self.integral,
            self.mean,
            self.median,
            self.max,
            self.min,
            self.sum,
            self.q25,
            self.q75,
        ]
    }
}

/// Window boundaries over `len` points
///
/// Windows hold `floor(density * len)` points, the last one possibly fewer.
/// A single window spans everything when that is below the minimum.
pub fn window_ranges(len: usize, thresholds: &Thresholds) -> Vec<std::ops::Range<usize>> {
    let size = (thresholds.interval_density * len as f64) as usize;
    if size < thresholds.min_points_in_interval || size == 0 {
        return vec![0..len];
    }
    (0..len)
        .step_by(size)
        .map(|start| start..(start + size).min(len))
        .collect()
}

/// Vote of one statistic: 0, ±0.5 or ±1 depending on the relative error
fn vote(rel_error: f64, thresholds: &Thresholds) -> f64 {
    let sign = if rel_error < 0.0 { -1.0 } else { 1.0 };
    if rel_error.abs() <= thresholds.stats_diff_no_change {
        0.0
    } else if rel_error.abs() <= thresholds.stats_diff_change {
        0.5 * sign
    } else {
        sign
    }
}

/// Compare the window statistics of two models of one uid
pub fn compute_local_statistics(
    uid: &str,
    baseline: &ModelRecord,
    target: &ModelRecord,
    target_profile: &Profile,
    ctx: &DetectionContext<'_>,
) -> Result<ChangeResult> {
    let aligned =
        preprocess_nonparam_models(uid, baseline, target_profile, target, ctx.fitter, ctx.samples())?;
    let thresholds = &ctx.config.thresholds;

    let mut intervals = Vec::new();
    for range in window_ranges(aligned.len(), thresholds) {
        if range.is_empty() {
            continue;
        }
        let x = &aligned.x[range.clone()];
        let baseline_stats = WindowStats::compute(x, &aligned.baseline_y[range.clone()]);
        let target_stats = WindowStats::compute(x, &aligned.target_y[range.clone()]);

        let mut score = 0.0;
        let mut rel_error_sum = 0.0;
        for (base, targ) in baseline_stats.values().iter().zip(target_stats.values()) {
            let rel_error = finite_or_zero(safe_division(targ - base, *base));
            rel_error_sum += rel_error;
            score += vote(rel_error, thresholds);
        }

        intervals.push(PartialInterval {
            change: classify_change(
                score,
                thresholds.stats_no_change,
                thresholds.stats_change,
                STAT_COUNT as f64,
            ),
            rel_error: rel_error_sum / STAT_COUNT as f64,
            start: round_to(x[0], 2),
            end: round_to(x[x.len() - 1], 2),
        });
    }

    let mean_rel_error = safe_division(
        intervals.iter().map(|i| i.rel_error).sum(),
        intervals.len() as f64,
    );
    let change = classify_change(
        mean_rel_error,
        thresholds.stats_diff_no_change,
        thresholds.stats_diff_change,
        1.0,
    );
    Ok(ChangeResult::new(change, round_to(mean_rel_error, 2)).with_intervals(intervals))
}
