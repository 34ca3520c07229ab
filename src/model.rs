//! Normalized representation of fitted regression models
//!
//! Profiles carry models as loose JSON objects. [`create_model_record`] turns
//! one of those into a [`ModelRecord`], validating it on the way so that the
//! detection strategies never have to look up coefficients by name.

use crate::error::{CheckError, Result};
use crate::profile::ModelEntry;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Type of a fitted model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Constant,
    Linear,
    Logarithmic,
    Quadratic,
    Power,
    Exponential,
    Regressogram,
    MovingAverage,
    KernelRegression,
}

impl ModelKind {
    /// Every parametric kind, in the order the fitter produces them
    pub const PARAMETRIC: [ModelKind; 6] = [
        ModelKind::Constant,
        ModelKind::Linear,
        ModelKind::Logarithmic,
        ModelKind::Quadratic,
        ModelKind::Power,
        ModelKind::Exponential,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Constant => "constant",
            ModelKind::Linear => "linear",
            ModelKind::Logarithmic => "logarithmic",
            ModelKind::Quadratic => "quadratic",
            ModelKind::Power => "power",
            ModelKind::Exponential => "exponential",
            ModelKind::Regressogram => "regressogram",
            ModelKind::MovingAverage => "moving_average",
            ModelKind::KernelRegression => "kernel_regression",
        }
    }

    /// Parametric models have a closed-form formula
    pub fn is_parametric(&self) -> bool {
        Self::PARAMETRIC.contains(self)
    }

    /// Number of coefficients the formula needs
    fn required_coefficients(&self) -> usize {
        match self {
            ModelKind::Constant => 1,
            ModelKind::Quadratic => 3,
            _ => 2,
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "constant" => Ok(ModelKind::Constant),
            "linear" => Ok(ModelKind::Linear),
            "logarithmic" | "log" => Ok(ModelKind::Logarithmic),
            "quadratic" | "quad" => Ok(ModelKind::Quadratic),
            "power" => Ok(ModelKind::Power),
            "exponential" | "exp" => Ok(ModelKind::Exponential),
            "regressogram" => Ok(ModelKind::Regressogram),
            "moving_average" => Ok(ModelKind::MovingAverage),
            "kernel_regression" => Ok(ModelKind::KernelRegression),
            other => Err(format!("unknown model type '{}'", other)),
        }
    }
}

/// Coefficients of a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coefficients {
    /// `b2` is 0 for everything but quadratic models
    Parametric { b0: f64, b1: f64, b2: f64 },
    /// Ordered per-bucket statistics of a non-parametric model
    Buckets(Vec<f64>),
}

/// One fitted model of one uid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    pub kind: ModelKind,
    pub r_square: f64,
    pub coefficients: Coefficients,
    pub x_start: f64,
    pub x_end: f64,
}

impl ModelRecord {
    /// Builds a parametric record without validation
    pub fn parametric(kind: ModelKind, r_square: f64, b0: f64, b1: f64, b2: f64) -> Self {
        Self {
            kind,
            r_square,
            coefficients: Coefficients::Parametric { b0, b1, b2 },
            x_start: 0.0,
            x_end: 0.0,
        }
    }

    /// Builds a non-parametric record without validation
    pub fn nonparametric(kind: ModelKind, r_square: f64, buckets: Vec<f64>) -> Self {
        Self {
            kind,
            r_square,
            coefficients: Coefficients::Buckets(buckets),
            x_start: 0.0,
            x_end: 0.0,
        }
    }

    pub fn with_interval(mut self, x_start: f64, x_end: f64) -> Self {
        self.x_start = x_start;
        self.x_end = x_end;
        self
    }

    pub fn is_parametric(&self) -> bool {
        matches!(self.coefficients, Coefficients::Parametric { .. })
    }

    /// Intercept of a parametric model, first bucket of a non-parametric one
    pub fn b0(&self) -> f64 {
        match &self.coefficients {
            Coefficients::Parametric { b0, .. } => *b0,
            Coefficients::Buckets(buckets) => buckets.first().copied().unwrap_or(0.0),
        }
    }

    /// `None` marks a non-parametric model
    pub fn b1(&self) -> Option<f64> {
        match &self.coefficients {
            Coefficients::Parametric { b1, .. } => Some(*b1),
            Coefficients::Buckets(_) => None,
        }
    }

    pub fn b2(&self) -> f64 {
        match &self.coefficients {
            Coefficients::Parametric { b2, .. } => *b2,
            Coefficients::Buckets(_) => 0.0,
        }
    }

    pub fn buckets(&self) -> Option<&[f64]> {
        match &self.coefficients {
            Coefficients::Buckets(buckets) => Some(buckets),
            Coefficients::Parametric { .. } => None,
        }
    }

    /// Number of buckets for non-parametric models, 1 otherwise
    pub fn coeff_size(&self) -> usize {
        match &self.coefficients {
            Coefficients::Buckets(buckets) => buckets.len(),
            Coefficients::Parametric { .. } => 1,
        }
    }
}

/// Validate a profile model entry and convert it into a [`ModelRecord`]
///
/// # Errors
/// [`CheckError::MalformedModel`] when the type is unknown, coefficients are
/// missing, the bucket sequence is empty, or the interval is inverted.
///
/// # Example
/// ```
/// use perfcheck::model::{create_model_record, ModelKind};
/// use perfcheck::profile::ModelEntry;
///
/// let entry = ModelEntry::parametric("main", ModelKind::Linear, 0.9, &[1.0, 2.0], 0.0, 10.0);
/// let record = create_model_record(&entry).unwrap();
/// assert_eq!(record.b1(), Some(2.0));
/// ```
pub fn create_model_record(entry: &ModelEntry) -> Result<ModelRecord> {
    let uid = entry.uid.as_str();
    let kind: ModelKind = entry
        .model
        .parse()
        .map_err(|reason: String| CheckError::malformed(uid, reason))?;

    if !entry.x_start.is_finite() || !entry.x_end.is_finite() {
        return Err(CheckError::malformed(uid, "interval bounds must be finite"));
    }
    if entry.x_start > entry.x_end {
        return Err(CheckError::malformed(
            uid,
            format!(
                "interval start {} is past interval end {}",
                entry.x_start, entry.x_end
            ),
        ));
    }

    let coefficients = if kind.is_parametric() {
        parametric_coefficients(uid, kind, entry)?
    } else {
        let buckets = entry
            .bucket_stats
            .as_ref()
            .filter(|stats| !stats.is_empty())
            .ok_or_else(|| {
                CheckError::malformed(uid, format!("{} model without bucket statistics", kind))
            })?;
        Coefficients::Buckets(buckets.clone())
    };

    Ok(ModelRecord {
        kind,
        r_square: entry.r_square,
        coefficients,
        x_start: entry.x_start,
        x_end: entry.x_end,
    })
}

fn parametric_coefficients(uid: &str, kind: ModelKind, entry: &ModelEntry) -> Result<Coefficients> {
    let required = kind.required_coefficients();
    if entry.coeffs.len() < required {
        return Err(CheckError::malformed(
            uid,
            format!(
                "{} model needs {} coefficients, found {}",
                kind,
                required,
                entry.coeffs.len()
            ),
        ));
    }
    let value = |index: usize| entry.coeffs.get(index).map_or(0.0, |c| c.value);

    Ok(Coefficients::Parametric {
        b0: value(0),
        b1: value(1),
        b2: if kind == ModelKind::Quadratic {
            value(2)
        } else {
            0.0
        },
    })
}
