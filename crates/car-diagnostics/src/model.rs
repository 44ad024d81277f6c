use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// An observable sign of a mechanical fault (e.g., "fumee_noire": black exhaust smoke).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Symptom {
    /// Unique key, e.g. "fumee_noire"
    pub id: String,
    /// Display text; this is also the text embedded for semantic search
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Free-form grouping, e.g. "engine", "cooling"
    #[serde(default)]
    pub category: Option<String>,
    /// Relative importance in [0.0, 1.0] used when scoring rules
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl PartialEq for Symptom {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Symptom {}

impl Hash for Symptom {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// How serious a diagnosed fault is. `Unknown` is only produced for uncertain diagnoses
/// and is never accepted from a rule file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Severity {
    Light,
    Medium,
    Critical,
    #[serde(skip_deserializing)]
    Unknown,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Light => "Light",
            Self::Medium => "Medium",
            Self::Critical => "Critical",
            Self::Unknown => "Unknown",
        };
        f.write_str(label)
    }
}

/// A candidate diagnosis defined by the symptoms it requires and those that support it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub name: String,
    pub description: String,
    pub severity: Severity,
    pub cost_min: u64,
    pub cost_max: u64,
    /// All of these must be present for a strong match
    pub required_symptoms: BTreeSet<String>,
    /// Each present one adds partial credit
    #[serde(default)]
    pub optional_symptoms: BTreeSet<String>,
    #[serde(default)]
    pub advice: Option<String>,
}

impl Rule {
    /// Cost range formatted for display, e.g. "40 000Ar - 120 000Ar".
    pub fn cost_range(&self, currency: &str) -> String {
        format!(
            "{}{currency} - {}{currency}",
            group_thousands(self.cost_min),
            group_thousands(self.cost_max)
        )
    }
}

/// Format an integer with a space as thousands separator.
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(' ');
        }
        out.push(ch);
    }
    out
}

/// Coarse bucketing of a match score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
pub enum Confidence {
    High,
    Medium,
    Low,
    #[serde(rename = "Very low")]
    VeryLow,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
            Self::VeryLow => "Very low",
        };
        f.write_str(label)
    }
}

/// A ranked rule that did not make the top spot.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct Candidate {
    pub rule_id: String,
    pub diagnosis: String,
    pub score: f64,
}

/// The outcome of a successful diagnosis, including the uncertain case.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct DiagnosisReport {
    /// Matched rule, `None` when no rule matched at all
    pub rule_id: Option<String>,
    pub diagnosis: String,
    pub description: String,
    pub severity: Severity,
    pub estimated_cost: String,
    pub advice: Option<String>,
    pub confidence: Confidence,
    /// Match score rounded to two decimals
    pub score: f64,
    /// Names of the catalog symptoms that took part in scoring
    pub symptoms_used: Vec<String>,
    /// Next best rules, highest score first
    pub alternatives: Vec<Candidate>,
}

impl DiagnosisReport {
    pub fn is_uncertain(&self) -> bool {
        self.rule_id.is_none()
    }
}

/// A semantic search hit.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SymptomMatch {
    pub symptom: Symptom,
    /// Cosine similarity rounded to three decimals
    pub similarity_score: f32,
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
