// Configuration of degradation checks
//
// Every classification constant lives in `Thresholds` and is applied by all
// strategies alike. The TOML file can override any of them together with
// the strategy rules.

use crate::error::{CheckError, Result};
use crate::selector::ModelsStrategy;
use crate::strategy::StrategyRule;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How matching strategy rules are applied
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplyPolicy {
    /// Stop after the first matching rule
    First,
    /// Apply every matching rule, each method at most once
    #[default]
    All,
}

/// Classification thresholds of all strategies
///
/// # Example
/// ```
/// use perfcheck::config::Thresholds;
///
/// let thresholds = Thresholds::default();
/// assert_eq!(thresholds.integral_no_change, 0.10);
/// assert_eq!(thresholds.aat_degradation_ratio, 2.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Integral comparison: largest relative error still reported as no change
    pub integral_no_change: f64,
    /// Integral comparison: largest relative error reported as a maybe-change
    pub integral_change: f64,

    /// Local statistics: per-statistic relative error without a vote
    pub stats_diff_no_change: f64,
    /// Local statistics: per-statistic relative error giving a half vote
    pub stats_diff_change: f64,
    /// Local statistics: vote score (per statistic) still reported as no change
    pub stats_no_change: f64,
    /// Local statistics: vote score (per statistic) reported as a maybe-change
    pub stats_change: f64,
    /// Local statistics: sub-interval length as a fraction of the curve length
    pub interval_density: f64,
    /// Local statistics: fewest points of a sub-interval
    pub min_points_in_interval: usize,

    /// General detection: coefficient difference tolerated as no change,
    /// relative to the baseline coefficient
    pub coefficient_tolerance: f64,
    /// General detection: relative error (in percent) separating a change
    /// from a maybe-change
    pub change_rate_percent: f64,
    /// Polynomial regression: residual sum of squares accepting a degree
    pub polynomial_residual: f64,
    /// Linear regression: tolerance of the intercept comparison
    pub intercept_tolerance: f64,
    /// Linear regression: tolerance of the gradient comparison
    pub gradient_tolerance: f64,
    /// Linear regression: r² required to label the error linear
    pub linear_r_square: f64,
    /// Linear regression: r² required to label the error quadratic
    pub quadratic_r_square: f64,
    /// Linear regression: r² margin the quadratic fit must win by
    pub r_square_margin: f64,

    /// Average amount threshold: target/baseline ratio reported as degradation
    pub aat_degradation_ratio: f64,
    /// Average amount threshold: target/baseline ratio reported as optimization
    pub aat_optimization_ratio: f64,

    /// Best model order equality: confidence needed to report a change
    pub bmoe_confidence: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            integral_no_change: 0.10,
            integral_change: 0.25,
            stats_diff_no_change: 0.10,
            stats_diff_change: 0.25,
            stats_no_change: 0.2,
            stats_change: 0.5,
            interval_density: 0.05,
            min_points_in_interval: 2,
            coefficient_tolerance: 0.05,
            change_rate_percent: 25.0,
            polynomial_residual: 1e8,
            intercept_tolerance: 0.05,
            gradient_tolerance: 0.30,
            linear_r_square: 0.95,
            quadratic_r_square: 0.90,
            r_square_margin: 0.01,
            aat_degradation_ratio: 2.0,
            aat_optimization_ratio: 0.5,
            bmoe_confidence: 0.9,
        }
    }
}

impl Thresholds {
    fn validate(&self) -> Result<()> {
        let ordered = [
            ("integral", self.integral_no_change, self.integral_change),
            (
                "stats_diff",
                self.stats_diff_no_change,
                self.stats_diff_change,
            ),
            ("stats", self.stats_no_change, self.stats_change),
        ];
        for (name, no_change, change) in ordered {
            if !(0.0..=change).contains(&no_change) {
                return Err(CheckError::InvalidConfig(format!(
                    "{name}_no_change must be within [0, {name}_change] (got {no_change} and {change})"
                )));
            }
        }

        if self.interval_density <= 0.0 || self.interval_density > 1.0 {
            return Err(CheckError::InvalidConfig(format!(
                "interval_density must be within (0, 1] (got {})",
                self.interval_density
            )));
        }
        if self.min_points_in_interval == 0 {
            return Err(CheckError::InvalidConfig(
                "min_points_in_interval must be at least 1".into(),
            ));
        }
        if !(self.aat_optimization_ratio > 0.0
            && self.aat_optimization_ratio <= 1.0
            && self.aat_degradation_ratio >= 1.0)
        {
            return Err(CheckError::InvalidConfig(format!(
                "average amount ratios must satisfy 0 < optimization <= 1 <= degradation (got {} and {})",
                self.aat_optimization_ratio, self.aat_degradation_ratio
            )));
        }

        let unit_rates = [
            ("coefficient_tolerance", self.coefficient_tolerance),
            ("intercept_tolerance", self.intercept_tolerance),
            ("gradient_tolerance", self.gradient_tolerance),
            ("linear_r_square", self.linear_r_square),
            ("quadratic_r_square", self.quadratic_r_square),
            ("r_square_margin", self.r_square_margin),
            ("bmoe_confidence", self.bmoe_confidence),
        ];
        for (name, value) in unit_rates {
            if !(0.0..=1.0).contains(&value) {
                return Err(CheckError::InvalidConfig(format!(
                    "{name} must be within [0, 1] (got {value})"
                )));
            }
        }
        if self.change_rate_percent < 0.0 || self.polynomial_residual <= 0.0 {
            return Err(CheckError::InvalidConfig(
                "change_rate_percent and polynomial_residual must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration of a degradation check run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    /// Whether the first or all matching strategy rules are applied
    pub apply: ApplyPolicy,

    /// Ordered strategy rules matched against the profile header
    pub strategies: Vec<StrategyRule>,

    /// Points sampled per parametric curve
    pub samples: usize,

    /// Model pairs whose rounded `min(r²)` is lower are not compared
    pub min_confidence: f64,

    /// Which models are paired for the model-pair strategies
    pub models_strategy: ModelsStrategy,

    /// Classification thresholds
    pub thresholds: Thresholds,

    /// Report uids found on one side only as `NotInBaseline` / `NotInTarget`
    pub report_missing: bool,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            apply: ApplyPolicy::All,
            strategies: StrategyRule::defaults(),
            samples: crate::curve::DEFAULT_SAMPLES,
            min_confidence: 0.15,
            models_strategy: ModelsStrategy::BestModel,
            thresholds: Thresholds::default(),
            report_missing: false,
        }
    }
}

impl CheckConfig {
    /// Narrow no-change bands, every uid accounted for
    pub fn strict() -> Self {
        Self {
            min_confidence: 0.5,
            report_missing: true,
            thresholds: Thresholds {
                integral_no_change: 0.05,
                integral_change: 0.15,
                stats_diff_no_change: 0.05,
                stats_diff_change: 0.15,
                change_rate_percent: 15.0,
                aat_degradation_ratio: 1.5,
                aat_optimization_ratio: 0.67,
                ..Thresholds::default()
            },
            ..Self::default()
        }
    }

    /// Wide no-change bands, low-confidence models compared too
    pub fn permissive() -> Self {
        Self {
            min_confidence: 0.0,
            thresholds: Thresholds {
                integral_no_change: 0.15,
                integral_change: 0.35,
                stats_diff_no_change: 0.15,
                stats_diff_change: 0.35,
                change_rate_percent: 35.0,
                aat_degradation_ratio: 3.0,
                aat_optimization_ratio: 0.33,
                ..Thresholds::default()
            },
            ..Self::default()
        }
    }

    /// Parse a configuration from TOML text and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: CheckConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.samples < 2 {
            return Err(CheckError::InvalidConfig(format!(
                "samples must be at least 2 (got {})",
                self.samples
            )));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(CheckError::InvalidConfig(format!(
                "min_confidence must be within [0, 1] (got {})",
                self.min_confidence
            )));
        }
        if let Some(rule) = self.strategies.iter().find(|r| r.method.trim().is_empty()) {
            return Err(CheckError::InvalidConfig(format!(
                "strategy rule without a method: {:?}",
                rule.conditions
            )));
        }
        self.thresholds.validate()
    }
}
