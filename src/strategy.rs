//! Resolution of detection strategies from configuration rules
//!
//! A rule names a detection method and optionally constrains the profiles it
//! applies to: `collector` must equal the collector name, `postprocessor`
//! must be one of the postprocessors that ran, and any other key must equal
//! the header field of the same name. Non-string values such as booleans
//! or integers are compared by their textual form.

use crate::check::CheckMethod;
use crate::config::{ApplyPolicy, CheckConfig};
use crate::error::{CheckError, Result};
use crate::profile::Profile;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// One configured detection rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyRule {
    /// Method name or alias, e.g. `int` or `integral_comparison`
    pub method: String,
    /// Remaining key/value constraints on the profile
    #[serde(flatten)]
    pub conditions: BTreeMap<String, toml::Value>,
}

impl StrategyRule {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            conditions: BTreeMap::new(),
        }
    }

    pub fn when(mut self, key: impl Into<String>, value: impl Into<toml::Value>) -> Self {
        self.conditions.insert(key.into(), value.into());
        self
    }

    /// Rules used when the configuration names none
    pub fn defaults() -> Vec<StrategyRule> {
        vec![StrategyRule::new("average_amount_threshold")]
    }
}

/// Expand a short strategy alias to its full name
///
/// Unknown names are returned unchanged.
pub fn parse_strategy(name: &str) -> &str {
    match name {
        "aat" => "average_amount_threshold",
        "bmoe" => "best_model_order_equality",
        "preg" => "polynomial_regression",
        "lreg" => "linear_regression",
        "fast" => "fast_check",
        "int" => "integral_comparison",
        "loc" => "local_statistics",
        other => other,
    }
}

/// Whether every constraint of the rule holds for the profile
pub fn is_rule_applicable_for(rule: &StrategyRule, profile: &Profile) -> bool {
    rule.conditions.iter().all(|(key, value)| {
        let expected = condition_text(value);
        match key.as_str() {
            "method" => true,
            "postprocessor" => profile.postprocessors.iter().any(|p| p.name == expected),
            "collector" => profile.collector_info.name == expected,
            other => profile.header_value(other).as_deref() == Some(expected.as_str()),
        }
    })
}

fn condition_text(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Ordered detection methods configured for the profile
///
/// Every method is returned at most once. With [`ApplyPolicy::First`] only
/// the first matching rule is used.
///
/// # Errors
/// [`CheckError::UnknownStrategy`] for a rule naming an unknown method and
/// [`CheckError::NoApplicableStrategy`] when no rule matches.
pub fn get_strategies_for(profile: &Profile, config: &CheckConfig) -> Result<Vec<CheckMethod>> {
    let mut methods: Vec<CheckMethod> = Vec::new();
    for rule in &config.strategies {
        if config.apply == ApplyPolicy::First && !methods.is_empty() {
            break;
        }
        if !is_rule_applicable_for(rule, profile) {
            debug!(method = %rule.method, "Strategy rule does not apply");
            continue;
        }
        let method: CheckMethod = rule.method.parse()?;
        if !methods.contains(&method) {
            methods.push(method);
        }
    }

    if methods.is_empty() {
        return Err(CheckError::NoApplicableStrategy {
            collector: profile.collector_info.name.clone(),
            postprocessors: profile.postprocessor_names().join(", "),
        });
    }
    Ok(methods)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> Profile {
        let mut profile = Profile::new()
            .with_collector("trace")
            .with_postprocessor("regression_analysis");
        profile.header.resource_type = "time".to_string();
        profile
    }

    fn config(apply: ApplyPolicy, rules: Vec<StrategyRule>) -> CheckConfig {
        CheckConfig {
            apply,
            strategies: rules,
            ..CheckConfig::default()
        }
    }

    #[test]
    fn test_aliases() {
        assert_eq!(parse_strategy("aat"), "average_amount_threshold");
        assert_eq!(parse_strategy("loc"), "local_statistics");
        assert_eq!(parse_strategy("fast_check"), "fast_check");
    }

    #[test]
    fn test_rule_applicability() {
        let profile = profile();
        assert!(is_rule_applicable_for(&StrategyRule::new("int"), &profile));
        assert!(is_rule_applicable_for(
            &StrategyRule::new("int")
                .when("collector", "trace")
                .when("postprocessor", "regression_analysis")
                .when("type", "time"),
            &profile
        ));
        assert!(!is_rule_applicable_for(
            &StrategyRule::new("int").when("collector", "memory"),
            &profile
        ));
        assert!(!is_rule_applicable_for(
            &StrategyRule::new("int").when("postprocessor", "moving_average"),
            &profile
        ));
        assert!(!is_rule_applicable_for(
            &StrategyRule::new("int").when("type", "memory"),
            &profile
        ));
    }

    #[test]
    fn test_non_string_conditions() {
        let mut profile = profile();
        profile
            .header
            .extra
            .insert("threads".to_string(), serde_json::json!(4));
        profile
            .header
            .extra
            .insert("warm".to_string(), serde_json::json!(true));

        let rules: CheckConfig = toml::from_str(
            r#"
            [[strategies]]
            method = "int"
            threads = 4
            warm = true
            "#,
        )
        .unwrap();
        assert!(is_rule_applicable_for(&rules.strategies[0], &profile));
        assert!(is_rule_applicable_for(
            &StrategyRule::new("int").when("threads", 4_i64),
            &profile
        ));
        assert!(!is_rule_applicable_for(
            &StrategyRule::new("int").when("threads", 8_i64),
            &profile
        ));
        assert!(!is_rule_applicable_for(
            &StrategyRule::new("int").when("warm", false),
            &profile
        ));
    }

    #[test]
    fn test_apply_all_skips_duplicates() {
        let rules = vec![
            StrategyRule::new("int"),
            StrategyRule::new("aat").when("collector", "memory"),
            StrategyRule::new("integral_comparison"),
            StrategyRule::new("bmoe"),
        ];
        let methods = get_strategies_for(&profile(), &config(ApplyPolicy::All, rules)).unwrap();
        assert_eq!(
            methods,
            vec![
                CheckMethod::IntegralComparison,
                CheckMethod::BestModelOrderEquality
            ]
        );
    }

    #[test]
    fn test_apply_first_stops_after_match() {
        let rules = vec![
            StrategyRule::new("aat").when("collector", "memory"),
            StrategyRule::new("loc"),
            StrategyRule::new("bmoe"),
        ];
        let methods = get_strategies_for(&profile(), &config(ApplyPolicy::First, rules)).unwrap();
        assert_eq!(methods, vec![CheckMethod::LocalStatistics]);
    }

    #[test]
    fn test_no_applicable_strategy() {
        let rules = vec![StrategyRule::new("aat").when("collector", "memory")];
        let err = get_strategies_for(&profile(), &config(ApplyPolicy::All, rules)).unwrap_err();
        assert!(matches!(err, CheckError::NoApplicableStrategy { .. }));
        assert!(err.to_string().contains("trace"));
    }

    #[test]
    fn test_unknown_method() {
        let rules = vec![StrategyRule::new("magic")];
        let err = get_strategies_for(&profile(), &config(ApplyPolicy::All, rules)).unwrap_err();
        assert!(matches!(err, CheckError::UnknownStrategy(name) if name == "magic"));
    }
}
