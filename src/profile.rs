//! Performance profiles consumed by the detector
//!
//! A profile is a JSON document with a header, the collector and
//! postprocessor descriptions, raw per-uid resource rows, and the regression
//! models fitted over those rows. Only the fields the detector needs are
//! typed; everything else is kept as free-form JSON.

use crate::error::Result;
use crate::fitting::{FitConfig, ModelFitter};
use crate::model::ModelKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Descriptive header of a profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileHeader {
    /// Kind of measured resource, e.g. `time` or `memory`
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Units per resource type, e.g. `{"time": "ms"}`
    pub units: BTreeMap<String, String>,
    pub cmd: String,
    pub args: String,
    pub workload: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Collector that produced the raw resources
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorInfo {
    pub name: String,
    pub params: BTreeMap<String, Value>,
}

/// Postprocessor that was run over the profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostprocessorInfo {
    pub name: String,
    pub params: BTreeMap<String, Value>,
}

/// One raw measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRow {
    pub uid: String,
    pub amount: f64,
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl ResourceRow {
    pub fn new(uid: impl Into<String>, amount: f64) -> Self {
        Self {
            uid: uid.into(),
            amount,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: f64) -> Self {
        self.fields.insert(key.into(), Value::from(value));
        self
    }

    /// Numeric value of a column; `amount` is addressable by name too
    pub fn value_of(&self, key: &str) -> Option<f64> {
        if key == "amount" {
            return Some(self.amount);
        }
        self.fields.get(key).and_then(Value::as_f64)
    }
}

/// Named coefficient of a parametric model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coefficient {
    #[serde(default)]
    pub name: String,
    pub value: f64,
}

/// Model as stored in the profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub uid: String,
    /// Model type tag, validated by [`crate::model::create_model_record`]
    pub model: String,
    #[serde(default)]
    pub r_square: f64,
    #[serde(default)]
    pub coeffs: Vec<Coefficient>,
    #[serde(default, alias = "x_interval_start")]
    pub x_start: f64,
    #[serde(default, alias = "x_interval_end")]
    pub x_end: f64,
    #[serde(default, alias = "bin_stats", skip_serializing_if = "Option::is_none")]
    pub bucket_stats: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub of_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistic_function: Option<String>,
    /// Name of the method that produced the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

impl ModelEntry {
    pub fn parametric(
        uid: impl Into<String>,
        kind: ModelKind,
        r_square: f64,
        coeffs: &[f64],
        x_start: f64,
        x_end: f64,
    ) -> Self {
        let names = ["b0", "b1", "b2"];
        Self {
            uid: uid.into(),
            model: kind.as_str().to_string(),
            r_square,
            coeffs: coeffs
                .iter()
                .enumerate()
                .map(|(i, value)| Coefficient {
                    name: names.get(i).map_or_else(|| format!("b{}", i), |n| n.to_string()),
                    value: *value,
                })
                .collect(),
            x_start,
            x_end,
            bucket_stats: None,
            per_key: None,
            of_key: None,
            statistic_function: None,
            method: Some("full".to_string()),
        }
    }

    pub fn nonparametric(
        uid: impl Into<String>,
        kind: ModelKind,
        r_square: f64,
        buckets: Vec<f64>,
        x_start: f64,
        x_end: f64,
    ) -> Self {
        Self {
            uid: uid.into(),
            model: kind.as_str().to_string(),
            r_square,
            coeffs: Vec::new(),
            x_start,
            x_end,
            bucket_stats: Some(buckets),
            per_key: None,
            of_key: None,
            statistic_function: None,
            method: Some(kind.as_str().to_string()),
        }
    }

    /// Group the entry belongs to
    ///
    /// Unknown type tags fall back to the shape of the stored data.
    pub fn group(&self) -> ModelGroup {
        match self.model.parse::<ModelKind>() {
            Ok(kind) if kind.is_parametric() => ModelGroup::Param,
            Ok(_) => ModelGroup::NonParam,
            Err(_) if self.bucket_stats.is_some() => ModelGroup::NonParam,
            Err(_) => ModelGroup::Param,
        }
    }
}

/// Model groups used for selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelGroup {
    Param,
    NonParam,
    Both,
}

impl ModelGroup {
    pub fn contains(&self, group: ModelGroup) -> bool {
        *self == ModelGroup::Both || *self == group
    }
}

/// Performance profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub header: ProfileHeader,
    pub collector_info: CollectorInfo,
    pub postprocessors: Vec<PostprocessorInfo>,
    pub resources: Vec<ResourceRow>,
    pub models: Vec<ModelEntry>,
}

impl Profile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: ModelEntry) -> Self {
        self.models.push(model);
        self
    }

    pub fn with_resource(mut self, row: ResourceRow) -> Self {
        self.resources.push(row);
        self
    }

    pub fn with_collector(mut self, name: impl Into<String>) -> Self {
        self.collector_info.name = name.into();
        self
    }

    pub fn with_postprocessor(mut self, name: impl Into<String>) -> Self {
        self.postprocessors.push(PostprocessorInfo {
            name: name.into(),
            params: BTreeMap::new(),
        });
        self
    }

    /// Parse a profile from JSON text
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a profile from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// All models of the given group, with their position in the profile
    pub fn all_models_of(&self, group: ModelGroup) -> impl Iterator<Item = (usize, &ModelEntry)> {
        self.models
            .iter()
            .enumerate()
            .filter(move |(_, model)| group.contains(model.group()))
    }

    /// Model of a given type for a uid, if the profile holds one
    pub fn get_model_of(&self, kind: ModelKind, uid: &str) -> Option<&ModelEntry> {
        self.models
            .iter()
            .find(|model| model.uid == uid && model.model.parse::<ModelKind>() == Ok(kind))
    }

    /// Distinct uids of the raw resources
    pub fn resource_uids(&self) -> BTreeSet<&str> {
        self.resources.iter().map(|row| row.uid.as_str()).collect()
    }

    /// `(per_key, of_key)` pairs of one uid, skipping rows without both keys
    pub fn points_of(&self, uid: &str, per_key: &str, of_key: &str) -> (Vec<f64>, Vec<f64>) {
        self.resources
            .iter()
            .filter(|row| row.uid == uid)
            .filter_map(|row| Some((row.value_of(per_key)?, row.value_of(of_key)?)))
            .unzip()
    }

    /// Header value addressed by a strategy rule key
    pub fn header_value(&self, key: &str) -> Option<String> {
        match key {
            "type" => Some(self.header.resource_type.clone()),
            "cmd" => Some(self.header.cmd.clone()),
            "args" => Some(self.header.args.clone()),
            "workload" => Some(self.header.workload.clone()),
            other => self.header.extra.get(other).map(|value| match value {
                Value::String(s) => s.clone(),
                v => v.to_string(),
            }),
        }
    }

    /// Unit of the measured amount, empty if the header has none
    pub fn amount_unit(&self) -> &str {
        self.header
            .units
            .get(&self.header.resource_type)
            .map_or("", String::as_str)
    }

    pub fn postprocessor_names(&self) -> Vec<&str> {
        self.postprocessors.iter().map(|p| p.name.as_str()).collect()
    }

    /// Collector, command, arguments, workload and postprocessors
    ///
    /// Two profiles are comparable only if these match.
    pub fn configuration(&self) -> (String, String, String, String, Vec<String>) {
        (
            self.collector_info.name.clone(),
            self.header.cmd.clone(),
            self.header.args.clone(),
            self.header.workload.clone(),
            self.postprocessors.iter().map(|p| p.name.clone()).collect(),
        )
    }

    /// Build a single-uid profile from sample points and fit models over it
    ///
    /// Points with a NaN coordinate are skipped. The samples are stored under
    /// the fit configuration's `per_key` / `of_key` columns.
    pub fn synthetic(
        uid: &str,
        xs: &[f64],
        ys: &[f64],
        config: &FitConfig,
        fitter: &dyn ModelFitter,
    ) -> Result<Self> {
        let resources = xs
            .iter()
            .zip(ys.iter())
            .filter(|(x, y)| !x.is_nan() && !y.is_nan())
            .map(|(&x, &y)| {
                let mut row = ResourceRow::new(uid, 0.0);
                row.fields.insert(config.per_key.clone(), Value::from(x));
                if config.of_key == "amount" {
                    row.amount = y;
                } else {
                    row.fields.insert(config.of_key.clone(), Value::from(y));
                }
                row
            })
            .collect();

        let profile = Profile {
            resources,
            ..Profile::default()
        };
        fitter.fit_profile(&profile, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE_JSON: &str = r#"{
        "header": {"type": "time", "units": {"time": "ms"}, "cmd": "./sort", "workload": "rand"},
        "collector_info": {"name": "trace"},
        "postprocessors": [{"name": "regression_analysis"}],
        "resources": [
            {"uid": "sort", "amount": 12.0, "structure-unit-size": 10},
            {"uid": "sort", "amount": 25.0, "structure-unit-size": 20}
        ],
        "models": [
            {"uid": "sort", "model": "linear", "r_square": 0.98,
             "coeffs": [{"name": "b0", "value": 1.0}, {"name": "b1", "value": 1.2}],
             "x_interval_start": 10, "x_interval_end": 20},
            {"uid": "sort", "model": "regressogram", "r_square": 0.7,
             "bucket_stats": [12.0, 25.0], "x_start": 10, "x_end": 20}
        ]
    }"#;

    #[test]
    fn test_parse_profile() {
        let profile = Profile::from_json_str(PROFILE_JSON).unwrap();
        assert_eq!(profile.collector_info.name, "trace");
        assert_eq!(profile.amount_unit(), "ms");
        assert_eq!(profile.models.len(), 2);
        assert_eq!(profile.models[0].x_start, 10.0);
        assert_eq!(profile.header_value("workload").as_deref(), Some("rand"));
    }

    #[test]
    fn test_model_groups() {
        let profile = Profile::from_json_str(PROFILE_JSON).unwrap();
        assert_eq!(profile.all_models_of(ModelGroup::Param).count(), 1);
        assert_eq!(profile.all_models_of(ModelGroup::NonParam).count(), 1);
        assert_eq!(profile.all_models_of(ModelGroup::Both).count(), 2);
    }

    #[test]
    fn test_points_of() {
        let profile = Profile::from_json_str(PROFILE_JSON).unwrap();
        let (xs, ys) = profile.points_of("sort", "structure-unit-size", "amount");
        assert_eq!(xs, vec![10.0, 20.0]);
        assert_eq!(ys, vec![12.0, 25.0]);
        assert!(profile.points_of("missing", "structure-unit-size", "amount").0.is_empty());
    }

    #[test]
    fn test_get_model_of() {
        let profile = Profile::from_json_str(PROFILE_JSON).unwrap();
        assert!(profile.get_model_of(ModelKind::Regressogram, "sort").is_some());
        assert!(profile.get_model_of(ModelKind::Power, "sort").is_none());
    }

    #[test]
    fn test_json_roundtrip_keeps_models() {
        let profile = Profile::from_json_str(PROFILE_JSON).unwrap();
        let reparsed = Profile::from_json_str(&profile.to_json().unwrap()).unwrap();
        assert_eq!(profile, reparsed);
    }
}
