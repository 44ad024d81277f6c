//! Diagnostic engine: scores every rule against a symptom set and reports the best match.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::catalog::Catalog;
use crate::model::{round_to, Candidate, Confidence, DiagnosisReport, Rule, Severity};
use crate::scorer;

const MAX_ALTERNATIVES: usize = 3;

pub const UNCERTAIN_DIAGNOSIS: &str = "Uncertain diagnosis";
const UNCERTAIN_DESCRIPTION: &str = "The observed symptoms do not clearly match a known problem.";
const UNCERTAIN_COST: &str = "Undetermined";
const UNCERTAIN_ADVICE: &str = "A full inspection by a mechanic is recommended.";

/// Score cut-offs for the confidence tiers. Scores at or above `high` are High, at or
/// above `medium` are Medium, anything else is Low.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceThresholds {
    high: f64,
    medium: f64,
}

impl ConfidenceThresholds {
    /// Returns `None` unless `0 <= medium <= high <= 1`.
    pub fn new(high: f64, medium: f64) -> Option<Self> {
        (0.0 <= medium && medium <= high && high <= 1.0).then_some(Self { high, medium })
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    pub fn medium(&self) -> f64 {
        self.medium
    }

    pub fn classify(&self, score: f64) -> Confidence {
        if score >= self.high {
            Confidence::High
        } else if score >= self.medium {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            high: 0.85,
            medium: 0.60,
        }
    }
}

/// Outcome of [`DiagnosticEngine::diagnose`].
#[derive(Debug, Clone)]
pub enum DiagnosisResult {
    /// A report was produced, possibly the uncertain one.
    Diagnosed(DiagnosisReport),
    /// None of the supplied ids exist in the catalog.
    NoValidSymptoms,
}

impl DiagnosisResult {
    pub fn report(&self) -> Option<&DiagnosisReport> {
        match self {
            Self::Diagnosed(report) => Some(report),
            Self::NoValidSymptoms => None,
        }
    }
}

pub struct DiagnosticEngine {
    catalog: Arc<Catalog>,
    thresholds: ConfidenceThresholds,
    currency: String,
}

impl DiagnosticEngine {
    pub fn new(catalog: Arc<Catalog>, thresholds: ConfidenceThresholds, currency: impl Into<String>) -> Self {
        Self {
            catalog,
            thresholds,
            currency: currency.into(),
        }
    }

    /// Diagnose a list of symptom ids.
    ///
    /// Ids unknown to the catalog are dropped and duplicates collapse, keeping the order of
    /// first occurrence. Rules are ranked by score; ties keep catalog order.
    pub fn diagnose(&self, symptom_ids: &[String]) -> DiagnosisResult {
        let mut seen = HashSet::new();
        let known: Vec<&str> = symptom_ids
            .iter()
            .map(String::as_str)
            .filter(|id| self.catalog.contains_symptom(id))
            .filter(|id| seen.insert(*id))
            .collect();

        if known.is_empty() {
            debug!(supplied = symptom_ids.len(), "no known symptom supplied");
            return DiagnosisResult::NoValidSymptoms;
        }

        let user_symptoms: HashSet<&str> = known.iter().copied().collect();
        let weights = self.catalog.weights();

        let mut ranked: Vec<(&Rule, f64)> = self
            .catalog
            .rules()
            .iter()
            .map(|rule| {
                let s = scorer::score(
                    &user_symptoms,
                    &rule.required_symptoms,
                    &rule.optional_symptoms,
                    weights,
                );
                (rule, s)
            })
            .filter(|(_, s)| *s > 0.0)
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        let symptoms_used: Vec<String> = known
            .iter()
            .filter_map(|id| self.catalog.symptom(id))
            .map(|s| s.name.clone())
            .collect();

        let Some((&(best, best_score), rest)) = ranked.split_first() else {
            debug!(symptoms = known.len(), "no rule matched");
            return DiagnosisResult::Diagnosed(uncertain_report(symptoms_used));
        };

        debug!(rule = %best.id, score = best_score, candidates = ranked.len(), "diagnosis ranked");

        let alternatives = rest
            .iter()
            .take(MAX_ALTERNATIVES)
            .map(|(rule, s)| Candidate {
                rule_id: rule.id.clone(),
                diagnosis: rule.name.clone(),
                score: round_to(*s, 2),
            })
            .collect();

        DiagnosisResult::Diagnosed(DiagnosisReport {
            rule_id: Some(best.id.clone()),
            diagnosis: best.name.clone(),
            description: best.description.clone(),
            severity: best.severity,
            estimated_cost: best.cost_range(&self.currency),
            advice: best.advice.clone(),
            confidence: self.thresholds.classify(best_score),
            score: round_to(best_score, 2),
            symptoms_used,
            alternatives,
        })
    }
}

fn uncertain_report(symptoms_used: Vec<String>) -> DiagnosisReport {
    DiagnosisReport {
        rule_id: None,
        diagnosis: UNCERTAIN_DIAGNOSIS.to_string(),
        description: UNCERTAIN_DESCRIPTION.to_string(),
        severity: Severity::Unknown,
        estimated_cost: UNCERTAIN_COST.to_string(),
        advice: Some(UNCERTAIN_ADVICE.to_string()),
        confidence: Confidence::VeryLow,
        score: 0.0,
        symptoms_used,
        alternatives: Vec::new(),
    }
}
