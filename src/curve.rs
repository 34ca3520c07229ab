//! Curve evaluation of fitted models
//!
//! Parametric models are sampled over their interval with the closed-form
//! formula of their type. Non-parametric models map their bucket statistics
//! onto evenly spaced points of the interval.

use crate::model::{ModelKind, ModelRecord};
use crate::numeric::{linspace, simpson};

/// Default number of points per sampled curve
pub const DEFAULT_SAMPLES: usize = 1000;

/// Abscissas closer to zero are moved here for formulas undefined at 0
pub const X_EPSILON: f64 = 1e-6;

/// Sampled curve
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl Curve {
    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// Keep only the first `len` points
    pub fn truncate(&mut self, len: usize) {
        self.x.truncate(len);
        self.y.truncate(len);
    }
}

/// Evenly spaced points that avoid the singularity at zero for the given kind
pub fn safe_linspace(kind: ModelKind, start: f64, end: f64, samples: usize) -> Vec<f64> {
    let mut points = linspace(start, end, samples);
    if matches!(kind, ModelKind::Logarithmic | ModelKind::Power) {
        for x in points.iter_mut().filter(|x| x.abs() < X_EPSILON) {
            *x = X_EPSILON;
        }
    }
    points
}

/// Value of a parametric model at `x`
///
/// Non-parametric models yield their bucket statistic for the bucket
/// containing `x`.
pub fn evaluate(model: &ModelRecord, x: f64) -> f64 {
    let (b0, b2) = (model.b0(), model.b2());
    let b1 = match model.b1() {
        Some(b1) => b1,
        None => return bucket_value(model, x),
    };
    match model.kind {
        ModelKind::Constant => b0,
        ModelKind::Linear => b0 + b1 * x,
        ModelKind::Quadratic => b0 + b1 * x + b2 * x * x,
        ModelKind::Logarithmic => b0 + b1 * x.ln(),
        ModelKind::Power => b0 * x.powf(b1),
        ModelKind::Exponential => b0 * b1.powf(x),
        _ => b0 + b1 * x,
    }
}

fn bucket_value(model: &ModelRecord, x: f64) -> f64 {
    let buckets = model.buckets().unwrap_or(&[]);
    if buckets.is_empty() {
        return 0.0;
    }
    let width = model.x_end - model.x_start;
    if width <= 0.0 {
        return buckets[0];
    }
    let position = ((x - model.x_start) / width * buckets.len() as f64).floor();
    let index = (position.max(0.0) as usize).min(buckets.len() - 1);
    buckets[index]
}

/// Sample a parametric model at `samples` points of its interval
pub fn get_function_values(model: &ModelRecord, samples: usize) -> Curve {
    let x = safe_linspace(model.kind, model.x_start, model.x_end, samples);
    let y = x.iter().map(|&xi| evaluate(model, xi)).collect();
    Curve { x, y }
}

/// Coordinates of any model
///
/// Parametric models are sampled; non-parametric ones pair their buckets
/// with evenly spaced points of the interval.
pub fn model_coordinates(model: &ModelRecord, samples: usize) -> Curve {
    match model.buckets() {
        Some(buckets) => Curve {
            x: linspace(model.x_start, model.x_end, buckets.len()),
            y: buckets.to_vec(),
        },
        None => get_function_values(model, samples),
    }
}

/// Definite integral of a model over its own interval
///
/// Parametric models use the antiderivative of their formula and fall back
/// to Simpson's rule over a dense sampling when that is not finite.
/// Non-parametric models always use Simpson's rule over their buckets.
pub fn integrate(model: &ModelRecord, samples: usize) -> f64 {
    if model.is_parametric() {
        let exact = closed_form_integral(model);
        if exact.is_finite() {
            return exact;
        }
    }
    let curve = model_coordinates(model, samples);
    simpson(&curve.x, &curve.y)
}

fn closed_form_integral(model: &ModelRecord) -> f64 {
    let (b0, b1, b2) = (model.b0(), model.b1().unwrap_or(0.0), model.b2());
    let (s, e) = (model.x_start, model.x_end);
    match model.kind {
        ModelKind::Constant => b0 * (e - s),
        ModelKind::Linear => b0 * (e - s) + b1 / 2.0 * (e * e - s * s),
        ModelKind::Quadratic => {
            b0 * (e - s) + b1 / 2.0 * (e * e - s * s) + b2 / 3.0 * (e.powi(3) - s.powi(3))
        }
        ModelKind::Logarithmic => {
            let antiderivative = |x: f64| {
                let x = x.max(X_EPSILON);
                b0 * x + b1 * (x * x.ln() - x)
            };
            antiderivative(e) - antiderivative(s)
        }
        ModelKind::Power => {
            if (b1 + 1.0).abs() < f64::EPSILON {
                b0 * (e.max(X_EPSILON).ln() - s.max(X_EPSILON).ln())
            } else {
                b0 / (b1 + 1.0) * (e.powf(b1 + 1.0) - s.powf(b1 + 1.0))
            }
        }
        ModelKind::Exponential => {
            if (b1 - 1.0).abs() < f64::EPSILON {
                b0 * (e - s)
            } else {
                b0 / b1.ln() * (b1.powf(e) - b1.powf(s))
            }
        }
        _ => f64::NAN,
    }
}
