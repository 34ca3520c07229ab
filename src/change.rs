//! Performance-change verdicts and the records emitted per compared uid

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered verdict of a comparison
///
/// The first nine variants are ordered from the worst degradation to the
/// best optimization. The last three are out-of-band sentinels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PerformanceChange {
    TotalDegradation,
    SevereDegradation,
    Degradation,
    MaybeDegradation,
    NoChange,
    MaybeOptimization,
    Optimization,
    SevereOptimization,
    TotalOptimization,
    Unknown,
    NotInBaseline,
    NotInTarget,
}

impl PerformanceChange {
    /// Verdict for the same change with the sign flipped
    pub fn mirror(self) -> Self {
        use PerformanceChange as P;
        match self {
            P::TotalDegradation => P::TotalOptimization,
            P::SevereDegradation => P::SevereOptimization,
            P::Degradation => P::Optimization,
            P::MaybeDegradation => P::MaybeOptimization,
            P::MaybeOptimization => P::MaybeDegradation,
            P::Optimization => P::Degradation,
            P::SevereOptimization => P::SevereDegradation,
            P::TotalOptimization => P::TotalDegradation,
            P::NotInBaseline => P::NotInTarget,
            P::NotInTarget => P::NotInBaseline,
            other => other,
        }
    }

    pub fn is_degradation(self) -> bool {
        self < PerformanceChange::NoChange
    }

    pub fn is_optimization(self) -> bool {
        self > PerformanceChange::NoChange && self <= PerformanceChange::TotalOptimization
    }

    /// Anything but `NoChange` and `Unknown`
    pub fn is_change(self) -> bool {
        !matches!(self, PerformanceChange::NoChange | PerformanceChange::Unknown)
    }

    pub fn label(self) -> &'static str {
        use PerformanceChange as P;
        match self {
            P::TotalDegradation => "total degradation",
            P::SevereDegradation => "severe degradation",
            P::Degradation => "degradation",
            P::MaybeDegradation => "maybe degradation",
            P::NoChange => "no change",
            P::MaybeOptimization => "maybe optimization",
            P::Optimization => "optimization",
            P::SevereOptimization => "severe optimization",
            P::TotalOptimization => "total optimization",
            P::Unknown => "unknown",
            P::NotInBaseline => "not in baseline",
            P::NotInTarget => "not in target",
        }
    }
}

impl fmt::Display for PerformanceChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Three-tier, sign-aware classification of a difference
///
/// `|diff| <= no_change * scale` is `NoChange`, `|diff| <= change * scale` is
/// a maybe-change, anything larger is a change. Negative differences are
/// optimizations.
///
/// # Example
/// ```
/// use perfcheck::change::{classify_change, PerformanceChange};
///
/// assert_eq!(classify_change(0.05, 0.10, 0.25, 1.0), PerformanceChange::NoChange);
/// assert_eq!(classify_change(-0.2, 0.10, 0.25, 1.0), PerformanceChange::MaybeOptimization);
/// assert_eq!(classify_change(0.5, 0.10, 0.25, 1.0), PerformanceChange::Degradation);
/// ```
pub fn classify_change(
    diff: f64,
    no_change_threshold: f64,
    change_threshold: f64,
    baseline_scale: f64,
) -> PerformanceChange {
    let magnitude = diff.abs();
    if magnitude <= no_change_threshold * baseline_scale {
        PerformanceChange::NoChange
    } else if magnitude <= change_threshold * baseline_scale {
        if diff < 0.0 {
            PerformanceChange::MaybeOptimization
        } else {
            PerformanceChange::MaybeDegradation
        }
    } else if diff < 0.0 {
        PerformanceChange::Optimization
    } else {
        PerformanceChange::Degradation
    }
}

/// Verdict of one sub-interval of a windowed comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialInterval {
    pub change: PerformanceChange,
    pub rel_error: f64,
    pub start: f64,
    pub end: f64,
}

/// Outcome of one deviation analysis
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeResult {
    pub change: PerformanceChange,
    pub rel_error: f64,
    pub partial_intervals: Option<Vec<PartialInterval>>,
}

impl ChangeResult {
    pub fn new(change: PerformanceChange, rel_error: f64) -> Self {
        Self {
            change,
            rel_error,
            partial_intervals: None,
        }
    }

    pub fn with_intervals(mut self, intervals: Vec<PartialInterval>) -> Self {
        self.partial_intervals = Some(intervals);
        self
    }
}

/// Result of comparing one uid between the baseline and the target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegradationInfo {
    pub result: PerformanceChange,
    pub location: String,
    pub from_baseline: String,
    pub to_target: String,
    #[serde(rename = "type")]
    pub change_type: String,
    pub rate_degradation: f64,
    pub confidence_type: String,
    pub confidence_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial_intervals: Option<Vec<PartialInterval>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_degradation_relative: Option<f64>,
}

impl DegradationInfo {
    pub fn new(
        result: PerformanceChange,
        location: impl Into<String>,
        from_baseline: impl Into<String>,
        to_target: impl Into<String>,
    ) -> Self {
        Self {
            result,
            location: location.into(),
            from_baseline: from_baseline.into(),
            to_target: to_target.into(),
            change_type: String::new(),
            rate_degradation: 0.0,
            confidence_type: "no".to_string(),
            confidence_rate: 0.0,
            partial_intervals: None,
            rate_degradation_relative: None,
        }
    }

    pub fn with_type(mut self, change_type: impl Into<String>) -> Self {
        self.change_type = change_type.into();
        self
    }

    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate_degradation = rate;
        self
    }

    pub fn with_confidence(mut self, confidence_type: impl Into<String>, rate: f64) -> Self {
        self.confidence_type = confidence_type.into();
        self.confidence_rate = rate;
        self
    }

    pub fn with_partial_intervals(mut self, intervals: Option<Vec<PartialInterval>>) -> Self {
        self.partial_intervals = intervals;
        self
    }

    pub fn with_relative_rate(mut self, rate: f64) -> Self {
        self.rate_degradation_relative = Some(rate);
        self
    }
}
