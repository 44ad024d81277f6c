//! Symptom and rule catalog.
//!
//! Loaded once at startup from two JSON files (arrays of records) and validated as a whole:
//! a catalog either loads completely or not at all. After loading it is immutable and
//! shared read-only between the search index and the diagnostic engine.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::info;

use crate::model::{Rule, Symptom};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed catalog file {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid catalog file {}: {reason}", .path.display())]
    Invalid { path: PathBuf, reason: String },
}

impl CatalogError {
    fn invalid(path: &Path, reason: impl Into<String>) -> Self {
        Self::Invalid {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    /// The file the error originated from.
    pub fn path(&self) -> &Path {
        match self {
            Self::Io { path, .. } | Self::Malformed { path, .. } | Self::Invalid { path, .. } => {
                path
            }
        }
    }
}

/// Locations of the two catalog files.
#[derive(Debug, Clone)]
pub struct CatalogSources {
    pub symptoms: PathBuf,
    pub rules: PathBuf,
}

#[derive(Debug)]
pub struct Catalog {
    symptoms: Vec<Symptom>,
    symptom_index: HashMap<String, usize>,
    rules: Vec<Rule>,
    weights: HashMap<String, f64>,
}

impl Catalog {
    /// Read, parse and validate both catalog files.
    pub fn load(sources: &CatalogSources) -> Result<Self, CatalogError> {
        let symptoms: Vec<Symptom> = read_records(&sources.symptoms)?;
        let rules: Vec<Rule> = read_records(&sources.rules)?;
        let catalog = Self::from_records(symptoms, rules, sources)?;
        info!(
            symptoms = catalog.symptoms.len(),
            rules = catalog.rules.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    /// Validate already-parsed records. `sources` only labels errors.
    pub fn from_records(
        symptoms: Vec<Symptom>,
        rules: Vec<Rule>,
        sources: &CatalogSources,
    ) -> Result<Self, CatalogError> {
        let symptom_index = validate_symptoms(&symptoms, &sources.symptoms)?;
        validate_rules(&rules, &symptom_index, &sources.rules)?;

        let weights = symptoms
            .iter()
            .map(|s| (s.id.clone(), s.weight))
            .collect();

        Ok(Self {
            symptoms,
            symptom_index,
            rules,
            weights,
        })
    }

    /// All symptoms in load order.
    pub fn symptoms(&self) -> &[Symptom] {
        &self.symptoms
    }

    pub fn symptom(&self, id: &str) -> Option<&Symptom> {
        self.symptom_index.get(id).map(|&i| &self.symptoms[i])
    }

    pub fn contains_symptom(&self, id: &str) -> bool {
        self.symptom_index.contains_key(id)
    }

    /// All rules in load order. Ranking ties are broken by this order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Symptom id to scoring weight.
    pub fn weights(&self) -> &HashMap<String, f64> {
        &self.weights
    }
}

fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, CatalogError> {
    let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| CatalogError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

fn validate_symptoms(
    symptoms: &[Symptom],
    path: &Path,
) -> Result<HashMap<String, usize>, CatalogError> {
    if symptoms.is_empty() {
        return Err(CatalogError::invalid(path, "no symptoms defined"));
    }

    let mut index = HashMap::with_capacity(symptoms.len());
    for (i, symptom) in symptoms.iter().enumerate() {
        if symptom.id.trim().is_empty() {
            return Err(CatalogError::invalid(
                path,
                format!("symptom #{} has an empty id", i + 1),
            ));
        }
        if symptom.name.trim().is_empty() {
            return Err(CatalogError::invalid(
                path,
                format!("symptom '{}' has an empty name", symptom.id),
            ));
        }
        if !(0.0..=1.0).contains(&symptom.weight) {
            return Err(CatalogError::invalid(
                path,
                format!(
                    "symptom '{}' has weight {} outside [0, 1]",
                    symptom.id, symptom.weight
                ),
            ));
        }
        if index.insert(symptom.id.clone(), i).is_some() {
            return Err(CatalogError::invalid(
                path,
                format!("duplicate symptom id '{}'", symptom.id),
            ));
        }
    }
    Ok(index)
}

fn validate_rules(
    rules: &[Rule],
    symptoms: &HashMap<String, usize>,
    path: &Path,
) -> Result<(), CatalogError> {
    let mut seen = HashSet::with_capacity(rules.len());
    for (i, rule) in rules.iter().enumerate() {
        if rule.id.trim().is_empty() {
            return Err(CatalogError::invalid(
                path,
                format!("rule #{} has an empty id", i + 1),
            ));
        }
        if !seen.insert(rule.id.as_str()) {
            return Err(CatalogError::invalid(
                path,
                format!("duplicate rule id '{}'", rule.id),
            ));
        }
        if rule.cost_min >= rule.cost_max {
            return Err(CatalogError::invalid(
                path,
                format!(
                    "rule '{}' has cost_min {} not below cost_max {}",
                    rule.id, rule.cost_min, rule.cost_max
                ),
            ));
        }
        if rule.required_symptoms.is_empty() && rule.optional_symptoms.is_empty() {
            return Err(CatalogError::invalid(
                path,
                format!("rule '{}' references no symptoms", rule.id),
            ));
        }

        let referenced = rule
            .required_symptoms
            .iter()
            .map(|s| ("required", s))
            .chain(rule.optional_symptoms.iter().map(|s| ("optional", s)));
        for (kind, symptom_id) in referenced {
            if !symptoms.contains_key(symptom_id) {
                return Err(CatalogError::invalid(
                    path,
                    format!(
                        "rule '{}' references unknown {kind} symptom '{symptom_id}'",
                        rule.id
                    ),
                ));
            }
        }
    }
    Ok(())
}
