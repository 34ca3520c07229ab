//! perfcheck - model-based performance degradation detection
//!
//! This library compares a baseline performance profile with a target
//! profile. Both carry regression models fitted per uid; the detection
//! strategies compare those models (or the raw amounts) and report one
//! verdict per uid, from total degradation to total optimization.

pub mod change;
pub mod check;
pub mod cli;
pub mod config;
pub mod curve;
pub mod detection;
pub mod error;
pub mod fitting;
pub mod model;
pub mod nonparam;
pub mod numeric;
pub mod profile;
pub mod report;
pub mod selector;
pub mod strategy;

pub use change::{classify_change, DegradationInfo, PerformanceChange};
pub use check::{CheckMethod, Checker};
pub use config::{ApplyPolicy, CheckConfig, Thresholds};
pub use detection::{check_profiles, degradation_between_profiles, DetectionContext};
pub use error::{CheckError, Result};
pub use fitting::{LeastSquaresFitter, ModelFitter};
pub use model::{ModelKind, ModelRecord};
pub use profile::Profile;
pub use report::CheckReport;
pub use selector::ModelsStrategy;
