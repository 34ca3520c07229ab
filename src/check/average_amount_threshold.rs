// Average amount threshold
//
// Groups the raw resources by uid and compares the average amounts of the
// baseline and the target. The target/baseline ratio crossing the
// degradation or optimization ratio is reported; no models are involved.

use super::Checker;
use crate::change::{DegradationInfo, PerformanceChange};
use crate::config::Thresholds;
use crate::detection::{report_missing_locations, DetectionContext};
use crate::error::Result;
use crate::numeric::{finite_or_zero, mean, round_to, safe_division};
use crate::profile::Profile;
use crate::report::CheckReport;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Average amount threshold strategy
#[derive(Debug, Clone, Copy, Default)]
pub struct AverageAmountThreshold;

impl Checker for AverageAmountThreshold {
    fn check(
        &self,
        baseline: &Profile,
        target: &Profile,
        ctx: &DetectionContext<'_>,
    ) -> Result<CheckReport> {
        let mut report = CheckReport::new("average_amount_threshold");
        let baseline_averages = get_averages(baseline);
        let target_averages = get_averages(target);
        let baseline_total: f64 = baseline_averages.values().sum();
        let unit = baseline.amount_unit();

        for (uid, &target_average) in &target_averages {
            let baseline_average = baseline_averages.get(uid).copied().unwrap_or(0.0);
            if baseline_average == 0.0 {
                debug!(uid = %uid, "No baseline average to compare with");
                continue;
            }

            let ratio = target_average / baseline_average;
            let change = classify_ratio(ratio, &ctx.config.thresholds);
            let difference = target_average - baseline_average;
            report.push(
                DegradationInfo::new(
                    change,
                    uid.as_str(),
                    format!("{baseline_average:.2}{unit}"),
                    format!("{target_average:.2}{unit}"),
                )
                .with_type(baseline.header.resource_type.as_str())
                .with_rate(round_to(
                    finite_or_zero(safe_division(difference, baseline_average) * 100.0),
                    2,
                ))
                .with_relative_rate(round_to(
                    finite_or_zero(safe_division(difference, baseline_total) * 100.0),
                    2,
                )),
            );
        }

        if ctx.config.report_missing {
            let uids = |averages: &BTreeMap<String, f64>| -> BTreeSet<String> {
                averages.keys().cloned().collect()
            };
            report_missing_locations(&mut report, &uids(&baseline_averages), &uids(&target_averages));
        }
        Ok(report)
    }
}

/// Average amount of the resources of every uid
///
/// Averaged in `f64`, amounts above 2^24 stay exact.
pub fn get_averages(profile: &Profile) -> BTreeMap<String, f64> {
    let mut amounts: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for row in &profile.resources {
        amounts.entry(row.uid.as_str()).or_default().push(row.amount);
    }

    amounts
        .into_iter()
        .map(|(uid, values)| (uid.to_string(), mean(&values)))
        .collect()
}

/// Verdict of a target/baseline ratio of average amounts
pub fn classify_ratio(ratio: f64, thresholds: &Thresholds) -> PerformanceChange {
    if ratio >= thresholds.aat_degradation_ratio {
        PerformanceChange::Degradation
    } else if ratio <= thresholds.aat_optimization_ratio {
        PerformanceChange::Optimization
    } else {
        PerformanceChange::NoChange
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CheckConfig;
    use crate::profile::ResourceRow;

    fn profile_with(rows: &[(&str, f64)]) -> Profile {
        let mut profile = rows
            .iter()
            .fold(Profile::new(), |profile, (uid, amount)| {
                profile.with_resource(ResourceRow::new(*uid, *amount))
            });
        profile.header.resource_type = "time".to_string();
        profile.header.units.insert("time".to_string(), "ms".to_string());
        profile
    }

    fn check(baseline: &Profile, target: &Profile) -> CheckReport {
        let config = CheckConfig::default();
        AverageAmountThreshold
            .check(baseline, target, &DetectionContext::new(&config))
            .unwrap()
    }

    #[test]
    fn test_ratio_thresholds() {
        let thresholds = Thresholds::default();
        assert_eq!(classify_ratio(2.5, &thresholds), PerformanceChange::Degradation);
        assert_eq!(classify_ratio(2.0, &thresholds), PerformanceChange::Degradation);
        assert_eq!(classify_ratio(0.4, &thresholds), PerformanceChange::Optimization);
        assert_eq!(classify_ratio(0.5, &thresholds), PerformanceChange::Optimization);
        assert_eq!(classify_ratio(1.0, &thresholds), PerformanceChange::NoChange);
    }

    #[test]
    fn test_averages_per_uid() {
        let profile = profile_with(&[("a", 50.0), ("a", 150.0), ("b", 10.0)]);
        let averages = get_averages(&profile);
        assert_eq!(averages["a"], 100.0);
        assert_eq!(averages["b"], 10.0);
    }

    #[test]
    fn test_large_amounts_keep_precision() {
        let profile = profile_with(&[
            ("f", 123_456_789.0),
            ("g", 100_000_001.0),
            ("g", 100_000_003.0),
        ]);
        let averages = get_averages(&profile);
        assert_eq!(averages["f"], 123_456_789.0);
        assert_eq!(averages["g"], 100_000_002.0);

        let target = profile_with(&[("f", 123_456_790.0)]);
        let report = check(&profile, &target);
        assert_eq!(report.degradations[0].from_baseline, "123456789.00ms");
        assert_eq!(report.degradations[0].to_target, "123456790.00ms");
    }

    #[test]
    fn test_degradation_labels() {
        let baseline = profile_with(&[("search", 80.0), ("search", 120.0)]);
        let target = profile_with(&[("search", 250.0)]);
        let report = check(&baseline, &target);

        assert_eq!(report.degradations.len(), 1);
        let info = &report.degradations[0];
        assert_eq!(info.result, PerformanceChange::Degradation);
        assert_eq!(info.from_baseline, "100.00ms");
        assert_eq!(info.to_target, "250.00ms");
        assert_eq!(info.change_type, "time");
        assert_eq!(info.rate_degradation, 150.0);
        assert_eq!(info.rate_degradation_relative, Some(150.0));
    }

    #[test]
    fn test_zero_or_missing_baseline_skipped() {
        let baseline = profile_with(&[("idle", 0.0)]);
        let target = profile_with(&[("idle", 5.0), ("new", 5.0)]);
        assert!(check(&baseline, &target).degradations.is_empty());
    }

    #[test]
    fn test_report_missing() {
        let baseline = profile_with(&[("old", 5.0), ("kept", 5.0)]);
        let target = profile_with(&[("kept", 5.0), ("new", 5.0)]);
        let config = CheckConfig {
            report_missing: true,
            ..CheckConfig::default()
        };
        let report = AverageAmountThreshold
            .check(&baseline, &target, &DetectionContext::new(&config))
            .unwrap();
        let changes = report.count_by_change();
        assert_eq!(changes[&PerformanceChange::NoChange], 1);
        assert_eq!(changes[&PerformanceChange::NotInTarget], 1);
        assert_eq!(changes[&PerformanceChange::NotInBaseline], 1);
    }
}
