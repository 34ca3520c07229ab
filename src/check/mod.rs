// Detection strategies
//
// Every strategy compares a baseline profile with a target profile and
// reports one record per comparable uid:
// - integral_comparison: definite integrals of the paired models
// - local_statistics: windowed descriptive statistics of the paired curves
// - polynomial_regression, linear_regression, fast_check: shape of the
//   difference between the best parametric models
// - average_amount_threshold: ratio of the mean measured amounts
// - best_model_order_equality: complexity rank of the best models
//
// Strategies are resolved by name through a static registry.

pub mod average_amount_threshold;
pub mod best_model_order_equality;
pub mod fast_check;
pub mod general_detection;
pub mod integral_comparison;
pub mod linear_regression;
pub mod local_statistics;
pub mod polynomial_regression;


use crate::detection::DetectionContext;
use crate::error::{CheckError, Result};
use crate::profile::Profile;
use crate::report::CheckReport;
use crate::strategy::parse_strategy;
use std::fmt;
use std::str::FromStr;

/// Common capability of all detection strategies
pub trait Checker {
    /// Compare the target profile against the baseline profile
    fn check(
        &self,
        baseline: &Profile,
        target: &Profile,
        ctx: &DetectionContext<'_>,
    ) -> Result<CheckReport>;
}

/// Closed set of detection strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckMethod {
    AverageAmountThreshold,
    BestModelOrderEquality,
    IntegralComparison,
    LocalStatistics,
    PolynomialRegression,
    LinearRegression,
    FastCheck,
}

const REGISTRY: [(&str, CheckMethod); 7] = [
    ("average_amount_threshold", CheckMethod::AverageAmountThreshold),
    ("best_model_order_equality", CheckMethod::BestModelOrderEquality),
    ("integral_comparison", CheckMethod::IntegralComparison),
    ("local_statistics", CheckMethod::LocalStatistics),
    ("polynomial_regression", CheckMethod::PolynomialRegression),
    ("linear_regression", CheckMethod::LinearRegression),
    ("fast_check", CheckMethod::FastCheck),
];

impl CheckMethod {
    /// Every strategy, in registry order
    pub fn all() -> impl Iterator<Item = CheckMethod> {
        REGISTRY.iter().map(|(_, method)| *method)
    }

    pub fn name(&self) -> &'static str {
        REGISTRY
            .iter()
            .find(|(_, method)| method == self)
            .map_or("unknown", |(name, _)| name)
    }

    fn checker(&self) -> &'static dyn Checker {
        match self {
            CheckMethod::AverageAmountThreshold => {
                &average_amount_threshold::AverageAmountThreshold
            }
            CheckMethod::BestModelOrderEquality => {
                &best_model_order_equality::BestModelOrderEquality
            }
            CheckMethod::IntegralComparison => &integral_comparison::IntegralComparison,
            CheckMethod::LocalStatistics => &local_statistics::LocalStatistics,
            CheckMethod::PolynomialRegression => &polynomial_regression::PolynomialRegression,
            CheckMethod::LinearRegression => &linear_regression::LinearRegression,
            CheckMethod::FastCheck => &fast_check::FastCheck,
        }
    }
}

impl Checker for CheckMethod {
    fn check(
        &self,
        baseline: &Profile,
        target: &Profile,
        ctx: &DetectionContext<'_>,
    ) -> Result<CheckReport> {
        tracing::debug!(strategy = self.name(), "Running detection strategy");
        self.checker().check(baseline, target, ctx)
    }
}

impl fmt::Display for CheckMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CheckMethod {
    type Err = CheckError;

    /// Accepts full names and short aliases such as `int` or `bmoe`
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let name = parse_strategy(s.trim());
        REGISTRY
            .iter()
            .find(|(registered, _)| *registered == name)
            .map(|(_, method)| *method)
            .ok_or_else(|| CheckError::UnknownStrategy(s.to_string()))
    }
}
