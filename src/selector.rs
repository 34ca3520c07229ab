//! Per-uid model selection
//!
//! Picks the model(s) of each uid that take part in a comparison: the best
//! model by r², the best model of a given type, or every model.

use crate::error::{CheckError, Result};
use crate::model::{create_model_record, ModelKind, ModelRecord};
use crate::profile::{ModelEntry, ModelGroup, Profile};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Decides whether `candidate` replaces `current` as the selected model
pub type Preference = fn(current: &ModelEntry, candidate: &ModelEntry) -> bool;

/// Default preference: strictly higher r²
pub fn higher_r_square(current: &ModelEntry, candidate: &ModelEntry) -> bool {
    candidate.r_square > current.r_square
}

/// Model selection policy
#[derive(Debug, Clone, Copy)]
pub enum ModelFilter {
    /// Highest r² of the group per uid
    BestRSquare,
    /// Models of one type, ties broken by the preference
    ByKind { kind: ModelKind, prefer: Preference },
    /// Every model, keyed by uid and type
    All,
}

impl ModelFilter {
    /// Filter selecting models of `kind`, preferring the highest r²
    pub fn by_kind(kind: ModelKind) -> Self {
        ModelFilter::ByKind {
            kind,
            prefer: higher_r_square,
        }
    }
}

/// Which models are paired between the baseline and the target
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelsStrategy {
    #[default]
    #[serde(rename = "best-model")]
    BestModel,
    #[serde(rename = "best-param")]
    BestParam,
    #[serde(rename = "best-nonparam")]
    BestNonparam,
    #[serde(rename = "all-param")]
    AllParam,
    #[serde(rename = "all-nonparam")]
    AllNonparam,
    #[serde(rename = "all-models")]
    AllModels,
    #[serde(rename = "best-both")]
    BestBoth,
}

impl ModelsStrategy {
    pub const ALL: [ModelsStrategy; 7] = [
        ModelsStrategy::BestModel,
        ModelsStrategy::BestParam,
        ModelsStrategy::BestNonparam,
        ModelsStrategy::AllParam,
        ModelsStrategy::AllNonparam,
        ModelsStrategy::AllModels,
        ModelsStrategy::BestBoth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelsStrategy::BestModel => "best-model",
            ModelsStrategy::BestParam => "best-param",
            ModelsStrategy::BestNonparam => "best-nonparam",
            ModelsStrategy::AllParam => "all-param",
            ModelsStrategy::AllNonparam => "all-nonparam",
            ModelsStrategy::AllModels => "all-models",
            ModelsStrategy::BestBoth => "best-both",
        }
    }

    /// Simple strategies the composite ones run in sequence
    pub fn components(&self) -> Vec<ModelsStrategy> {
        match self {
            ModelsStrategy::AllModels => vec![ModelsStrategy::AllParam, ModelsStrategy::AllNonparam],
            ModelsStrategy::BestBoth => {
                vec![ModelsStrategy::BestParam, ModelsStrategy::BestNonparam]
            }
            simple => vec![*simple],
        }
    }

    /// Group and filter of a simple strategy
    pub fn selection(&self) -> (ModelGroup, ModelFilter) {
        match self {
            ModelsStrategy::BestModel => (ModelGroup::Both, ModelFilter::BestRSquare),
            ModelsStrategy::BestParam => (ModelGroup::Param, ModelFilter::BestRSquare),
            ModelsStrategy::BestNonparam => (ModelGroup::NonParam, ModelFilter::BestRSquare),
            ModelsStrategy::AllParam | ModelsStrategy::AllModels => {
                (ModelGroup::Param, ModelFilter::All)
            }
            ModelsStrategy::AllNonparam => (ModelGroup::NonParam, ModelFilter::All),
            ModelsStrategy::BestBoth => (ModelGroup::Both, ModelFilter::BestRSquare),
        }
    }

    /// Strategies keyed by uid and type
    pub fn keys_by_type(&self) -> bool {
        matches!(self, ModelsStrategy::AllParam | ModelsStrategy::AllNonparam)
    }
}

impl fmt::Display for ModelsStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelsStrategy {
    type Err = CheckError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|strategy| strategy.as_str() == s)
            .copied()
            .ok_or_else(|| CheckError::UnknownModelsStrategy(s.to_string()))
    }
}

/// Selected model entries per key, without validation
///
/// With [`ModelFilter::All`] the key is `uid + type`, otherwise the uid.
/// Filters other than `All` drop uids whose selected r² is not positive.
pub fn select_entries<'p>(
    profile: &'p Profile,
    group: ModelGroup,
    filter: ModelFilter,
) -> BTreeMap<String, &'p ModelEntry> {
    let mut selected: BTreeMap<String, &ModelEntry> = BTreeMap::new();
    for (_, entry) in profile.all_models_of(group) {
        match filter {
            ModelFilter::All => {
                selected.insert(format!("{}{}", entry.uid, entry.model), entry);
            }
            ModelFilter::BestRSquare => {
                replace_if(&mut selected, entry, higher_r_square);
            }
            ModelFilter::ByKind { kind, prefer } => {
                if entry.model.parse::<ModelKind>() == Ok(kind) {
                    replace_if(&mut selected, entry, prefer);
                }
            }
        }
    }

    if !matches!(filter, ModelFilter::All) {
        selected.retain(|_, entry| entry.r_square > 0.0);
    }
    selected
}

fn replace_if<'p>(
    selected: &mut BTreeMap<String, &'p ModelEntry>,
    candidate: &'p ModelEntry,
    prefer: Preference,
) {
    match selected.get(&candidate.uid) {
        Some(current) if !prefer(current, candidate) => {}
        _ => {
            selected.insert(candidate.uid.clone(), candidate);
        }
    }
}

/// Validated best models per key
///
/// # Errors
/// [`CheckError::MalformedModel`] if any selected entry is malformed.
pub fn get_filtered_best_models_of(
    profile: &Profile,
    group: ModelGroup,
    filter: ModelFilter,
) -> Result<BTreeMap<String, ModelRecord>> {
    select_entries(profile, group, filter)
        .into_iter()
        .map(|(key, entry)| Ok((key, create_model_record(entry)?)))
        .collect()
}

/// Location of a selection key, with the model type suffix removed
pub fn location_of(key: &str, kind_name: &str, keyed_by_type: bool) -> String {
    if keyed_by_type {
        key.strip_suffix(kind_name).unwrap_or(key).to_string()
    } else {
        key.to_string()
    }
}
