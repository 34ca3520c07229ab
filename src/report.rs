// Reports of degradation check runs
//
// Collects the records of one strategy run, the uids that could not be
// compared, and renders both as text or JSON.

use crate::change::{DegradationInfo, PartialInterval, PerformanceChange};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A uid left out of the comparison because evaluating it failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedUid {
    pub uid: String,
    pub reason: String,
}

/// Result of running one detection strategy over two profiles
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckReport {
    /// Full name of the strategy that produced the records
    pub strategy: String,
    pub degradations: Vec<DegradationInfo>,
    pub skipped: Vec<SkippedUid>,
}

impl CheckReport {
    pub fn new(strategy: impl Into<String>) -> Self {
        Self {
            strategy: strategy.into(),
            ..Self::default()
        }
    }

    pub fn push(&mut self, info: DegradationInfo) {
        self.degradations.push(info);
    }

    pub fn skip(&mut self, uid: impl Into<String>, reason: impl Into<String>) {
        self.skipped.push(SkippedUid {
            uid: uid.into(),
            reason: reason.into(),
        });
    }

    /// Append the records of another run of the same strategy
    pub fn merge(&mut self, other: CheckReport) {
        self.degradations.extend(other.degradations);
        self.skipped.extend(other.skipped);
    }

    /// Number of records per verdict
    pub fn count_by_change(&self) -> BTreeMap<PerformanceChange, usize> {
        let mut counts = BTreeMap::new();
        for info in &self.degradations {
            *counts.entry(info.result).or_insert(0) += 1;
        }
        counts
    }

    /// Whether any record reports a degradation
    pub fn has_degradation(&self) -> bool {
        self.degradations.iter().any(|d| d.result.is_degradation())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Generate human-readable report
    pub fn to_report_string(&self) -> String {
        let mut report = String::new();
        report.push_str(&format!("=== {} ===\n", self.strategy));

        if self.degradations.is_empty() {
            report.push_str("No comparable locations\n");
        }

        for info in &self.degradations {
            report.push_str(&format!(
                "{} {}: {} -> {}",
                marker(info.result),
                info.location,
                info.from_baseline,
                info.to_target
            ));
            report.push_str(&format!(" [{}", info.result));
            if !info.change_type.is_empty() {
                report.push_str(&format!(", {}", info.change_type));
            }
            report.push_str(&format!(
                "] rate {:.2}, {} {:.2}",
                info.rate_degradation, info.confidence_type, info.confidence_rate
            ));
            if let Some(relative) = info.rate_degradation_relative {
                report.push_str(&format!(", relative {:.2}", relative));
            }
            report.push('\n');

            if let Some(intervals) = &info.partial_intervals {
                for interval in aggregate_intervals(intervals) {
                    report.push_str(&format!(
                        "    <{:.2}, {:.2}> {} ({:.2})\n",
                        interval.start, interval.end, interval.change, interval.rel_error
                    ));
                }
            }
        }

        if !self.skipped.is_empty() {
            report.push_str(&format!("\nSkipped locations ({}):\n", self.skipped.len()));
            for skipped in &self.skipped {
                report.push_str(&format!("  - {}: {}\n", skipped.uid, skipped.reason));
            }
        }

        let counts = self.count_by_change();
        if !counts.is_empty() {
            let summary: Vec<String> = counts
                .iter()
                .map(|(change, count)| format!("{} {}", count, change))
                .collect();
            report.push_str(&format!("\nSummary: {}\n", summary.join(", ")));
        }
        report
    }
}

fn marker(change: PerformanceChange) -> &'static str {
    if change.is_degradation() {
        "-"
    } else if change.is_optimization() {
        "+"
    } else if change == PerformanceChange::NoChange {
        "="
    } else {
        "?"
    }
}

/// Merge adjacent intervals with the same verdict and drop unchanged ones
///
/// Merged intervals span from the first start to the last end and carry the
/// mean relative error of their members.
pub fn aggregate_intervals(intervals: &[PartialInterval]) -> Vec<PartialInterval> {
    let mut aggregated: Vec<(PartialInterval, usize)> = Vec::new();
    let mut previous: Option<PerformanceChange> = None;

    for interval in intervals {
        let extends_last = previous == Some(interval.change);
        previous = Some(interval.change);
        if interval.change == PerformanceChange::NoChange {
            continue;
        }
        match aggregated.last_mut() {
            Some((last, count)) if extends_last => {
                last.end = interval.end;
                last.rel_error += interval.rel_error;
                *count += 1;
            }
            _ => aggregated.push((interval.clone(), 1)),
        }
    }

    aggregated
        .into_iter()
        .map(|(mut interval, count)| {
            interval.rel_error /= count as f64;
            interval
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interval(change: PerformanceChange, rel_error: f64, start: f64, end: f64) -> PartialInterval {
        PartialInterval {
            change,
            rel_error,
            start,
            end,
        }
    }

    #[test]
    fn test_aggregate_merges_adjacent() {
        use PerformanceChange as P;
        let intervals = vec![
            interval(P::Degradation, 0.4, 0.0, 1.0),
            interval(P::Degradation, 0.6, 1.0, 2.0),
            interval(P::NoChange, 0.0, 2.0, 3.0),
            interval(P::Degradation, 0.3, 3.0, 4.0),
            interval(P::MaybeOptimization, -0.2, 4.0, 5.0),
        ];
        let merged = aggregate_intervals(&intervals);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].start, 0.0);
        assert_eq!(merged[0].end, 2.0);
        assert!((merged[0].rel_error - 0.5).abs() < 1e-12);
        assert_eq!(merged[1].start, 3.0);
        assert_eq!(merged[2].change, P::MaybeOptimization);
    }

    #[test]
    fn test_aggregate_all_unchanged() {
        let intervals = vec![interval(PerformanceChange::NoChange, 0.0, 0.0, 1.0)];
        assert!(aggregate_intervals(&intervals).is_empty());
    }

    #[test]
    fn test_report_string() {
        let mut report = CheckReport::new("integral_comparison");
        report.push(
            DegradationInfo::new(PerformanceChange::Degradation, "sort", "linear", "linear")
                .with_rate(0.5)
                .with_confidence("r_square", 0.95),
        );
        report.skip("broken", "Malformed model");
        let text = report.to_report_string();
        assert!(text.contains("=== integral_comparison ==="));
        assert!(text.contains("- sort: linear -> linear [degradation] rate 0.50, r_square 0.95"));
        assert!(text.contains("broken: Malformed model"));
        assert!(text.contains("Summary: 1 degradation"));
        assert!(report.has_degradation());
    }

    #[test]
    fn test_count_by_change_and_merge() {
        let mut first = CheckReport::new("aat");
        first.push(DegradationInfo::new(PerformanceChange::NoChange, "a", "", ""));
        let mut second = CheckReport::new("aat");
        second.push(DegradationInfo::new(PerformanceChange::NoChange, "b", "", ""));
        second.push(DegradationInfo::new(PerformanceChange::Optimization, "c", "", ""));
        first.merge(second);
        let counts = first.count_by_change();
        assert_eq!(counts[&PerformanceChange::NoChange], 2);
        assert_eq!(counts[&PerformanceChange::Optimization], 1);
        assert!(!first.has_degradation());
    }

    #[test]
    fn test_json_output() {
        let report = CheckReport::new("fast_check");
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["strategy"], "fast_check");
        assert!(json["degradations"].as_array().unwrap().is_empty());
    }
}
