//! Shared fixtures for unit tests: a small catalog and deterministic encoders.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::catalog::{Catalog, CatalogSources};
use crate::model::{Rule, Severity, Symptom};
use diag_common::embedding::TextEncoder;
use diag_common::error::CommonError;

const FAKE_DIMENSIONS: usize = 64;

/// Bag-of-words encoder: every lowercase token is hashed into one of a fixed number of
/// buckets and the result is L2-normalized. Identical texts map to identical vectors and
/// texts sharing words have positive similarity.
#[derive(Default)]
pub struct FakeEncoder {
    batch_calls: AtomicUsize,
}

impl FakeEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `encode` calls so far, queries included.
    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    fn vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; FAKE_DIMENSIONS];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            token.to_lowercase().hash(&mut hasher);
            v[(hasher.finish() % FAKE_DIMENSIONS as u64) as usize] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        v
    }
}

impl TextEncoder for FakeEncoder {
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CommonError> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }
}

/// Encoder whose every call fails.
pub struct FailingEncoder;

impl TextEncoder for FailingEncoder {
    fn encode(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, CommonError> {
        Err(CommonError::Embedding("encoder offline".to_string()))
    }
}

fn symptom(id: &str, name: &str, category: &str, weight: f64) -> Symptom {
    Symptom {
        id: id.to_string(),
        name: name.to_string(),
        description: None,
        category: Some(category.to_string()),
        weight,
    }
}

fn ids(list: &[&str]) -> BTreeSet<String> {
    list.iter().map(|s| s.to_string()).collect()
}

pub fn sample_symptoms() -> Vec<Symptom> {
    vec![
        symptom("fumee_noire", "Black exhaust smoke", "engine", 1.0),
        symptom("consommation_elevee", "High fuel consumption", "engine", 1.0),
        symptom("surchauffe_moteur", "Engine overheating", "cooling", 1.0),
        symptom("fuite_liquide", "Coolant leak under the car", "cooling", 1.0),
        symptom("demarrage_difficile", "Hard starting", "electrical", 1.0),
        symptom("voyants_faibles", "Dim dashboard lights", "electrical", 0.6),
        symptom("bruit_freinage", "Squealing noise when braking", "brakes", 1.0),
    ]
}

pub fn sample_rules() -> Vec<Rule> {
    vec![
        Rule {
            id: "injection".to_string(),
            name: "Injection fault".to_string(),
            description: "Injectors deliver too much fuel, combustion is incomplete."
                .to_string(),
            severity: Severity::Medium,
            cost_min: 40_000,
            cost_max: 120_000,
            required_symptoms: ids(&["fumee_noire", "consommation_elevee"]),
            optional_symptoms: BTreeSet::new(),
            advice: Some("Have the injectors cleaned or replaced.".to_string()),
        },
        Rule {
            id: "radiateur".to_string(),
            name: "Faulty radiator".to_string(),
            description: "The cooling circuit loses coolant through the radiator.".to_string(),
            severity: Severity::Critical,
            cost_min: 80_000,
            cost_max: 250_000,
            required_symptoms: ids(&["surchauffe_moteur", "fuite_liquide"]),
            optional_symptoms: BTreeSet::new(),
            advice: Some("Stop driving and check the coolant level.".to_string()),
        },
        Rule {
            id: "batterie".to_string(),
            name: "Weak battery".to_string(),
            description: "The battery no longer holds enough charge.".to_string(),
            severity: Severity::Light,
            cost_min: 150_000,
            cost_max: 400_000,
            required_symptoms: ids(&["demarrage_difficile"]),
            optional_symptoms: ids(&["voyants_faibles"]),
            advice: None,
        },
    ]
}

pub fn sample_sources() -> CatalogSources {
    CatalogSources {
        symptoms: PathBuf::from("fixtures/symptoms.json"),
        rules: PathBuf::from("fixtures/rules.json"),
    }
}

pub fn sample_catalog() -> Catalog {
    Catalog::from_records(sample_symptoms(), sample_rules(), &sample_sources())
        .expect("sample catalog is valid")
}
