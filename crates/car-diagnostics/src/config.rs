use std::path::PathBuf;
use std::str::FromStr;

use crate::catalog::CatalogSources;
use crate::engine::ConfidenceThresholds;
use crate::error::AppError;
use crate::index::DEFAULT_THRESHOLD;
use crate::validation::RequestLimits;
use diag_common::embedding::EmbeddingModelKind;

/// Application configuration loaded explicitly from environment variables.
///
/// Every value has a default, so the server starts with no environment at all as long as
/// the catalog files exist under `data/`.
#[derive(Debug, Clone)]
pub struct Config {
    /// Symptom catalog file.
    pub symptoms_path: PathBuf,
    /// Rule catalog file.
    pub rules_path: PathBuf,
    pub thresholds: ConfidenceThresholds,
    /// Minimum cosine similarity for a search hit.
    pub search_threshold: f32,
    /// Search result count when the caller does not specify one.
    pub search_top_k: usize,
    pub limits: RequestLimits,
    /// Suffix appended to formatted costs, e.g. "Ar".
    pub cost_currency: String,
    pub embedding_model: EmbeddingModelKind,
    /// Chat model used for explanations. `None` disables explanations.
    pub explain_model: Option<String>,
    /// TCP address to serve on instead of stdio.
    pub tcp_listen_addr: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Optional:
    /// - `CATALOG_DIR`: directory holding `symptoms.json` and `rules.json` (default `data`)
    /// - `SYMPTOMS_FILE`, `RULES_FILE`: override either file individually
    /// - `CONFIDENCE_HIGH`, `CONFIDENCE_MEDIUM`: confidence tier thresholds
    /// - `SEARCH_THRESHOLD`, `SEARCH_TOP_K`: semantic search defaults
    /// - `MIN_SYMPTOMS_PER_REQUEST`, `MAX_SYMPTOMS_PER_REQUEST`
    /// - `SEARCH_TEXT_MIN_CHARS`, `SEARCH_TEXT_MAX_CHARS`
    /// - `COST_CURRENCY`: cost suffix (default `Ar`)
    /// - `EMBEDDING_MODEL`: `all-minilm-l6-v2` or `nomic-embed-text-v1.5`
    /// - `EXPLAIN_MODEL`: chat model for explanations (omit to disable)
    /// - `MCP_TCP_LISTEN_ADDR`: serve on TCP instead of stdio
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let catalog_dir = PathBuf::from(lookup("CATALOG_DIR").unwrap_or_else(|| "data".to_string()));
        let symptoms_path = lookup("SYMPTOMS_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| catalog_dir.join("symptoms.json"));
        let rules_path = lookup("RULES_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| catalog_dir.join("rules.json"));

        let defaults = ConfidenceThresholds::default();
        let high = parse_var(&lookup, "CONFIDENCE_HIGH", defaults.high())?;
        let medium = parse_var(&lookup, "CONFIDENCE_MEDIUM", defaults.medium())?;
        let thresholds = ConfidenceThresholds::new(high, medium).ok_or_else(|| {
            AppError::Config(format!(
                "confidence thresholds must satisfy 0 <= CONFIDENCE_MEDIUM ({medium}) <= CONFIDENCE_HIGH ({high}) <= 1"
            ))
        })?;

        let search_threshold: f32 = parse_var(&lookup, "SEARCH_THRESHOLD", DEFAULT_THRESHOLD)?;
        if !(0.0..=1.0).contains(&search_threshold) {
            return Err(AppError::Config(format!(
                "SEARCH_THRESHOLD must be within [0, 1], got {search_threshold}"
            )));
        }

        let limit_defaults = RequestLimits::default();
        let limits = RequestLimits {
            min_symptoms: parse_var(&lookup, "MIN_SYMPTOMS_PER_REQUEST", limit_defaults.min_symptoms)?,
            max_symptoms: parse_var(&lookup, "MAX_SYMPTOMS_PER_REQUEST", limit_defaults.max_symptoms)?,
            search_min_chars: parse_var(&lookup, "SEARCH_TEXT_MIN_CHARS", limit_defaults.search_min_chars)?,
            search_max_chars: parse_var(&lookup, "SEARCH_TEXT_MAX_CHARS", limit_defaults.search_max_chars)?,
            max_top_k: limit_defaults.max_top_k,
        };
        if limits.min_symptoms == 0 || limits.min_symptoms > limits.max_symptoms {
            return Err(AppError::Config(format!(
                "symptom limits must satisfy 1 <= MIN_SYMPTOMS_PER_REQUEST ({}) <= MAX_SYMPTOMS_PER_REQUEST ({})",
                limits.min_symptoms, limits.max_symptoms
            )));
        }
        if limits.search_min_chars > limits.search_max_chars {
            return Err(AppError::Config(format!(
                "SEARCH_TEXT_MIN_CHARS ({}) exceeds SEARCH_TEXT_MAX_CHARS ({})",
                limits.search_min_chars, limits.search_max_chars
            )));
        }

        let search_top_k: usize = parse_var(&lookup, "SEARCH_TOP_K", 5)?;
        let search_top_k = search_top_k.clamp(1, limits.max_top_k);

        let embedding_model = match lookup("EMBEDDING_MODEL") {
            Some(name) => EmbeddingModelKind::parse(&name).ok_or_else(|| {
                AppError::Config(format!("unsupported EMBEDDING_MODEL: '{name}'"))
            })?,
            None => EmbeddingModelKind::default(),
        };

        Ok(Self {
            symptoms_path,
            rules_path,
            thresholds,
            search_threshold,
            search_top_k,
            limits,
            cost_currency: lookup("COST_CURRENCY").unwrap_or_else(|| "Ar".to_string()),
            embedding_model,
            explain_model: lookup("EXPLAIN_MODEL"),
            tcp_listen_addr: lookup("MCP_TCP_LISTEN_ADDR"),
        })
    }

    pub fn catalog_sources(&self) -> CatalogSources {
        CatalogSources {
            symptoms: self.symptoms_path.clone(),
            rules: self.rules_path.clone(),
        }
    }
}

fn parse_var<T: FromStr>(
    lookup: impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, AppError> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{key} has an invalid value: '{raw}'"))),
        None => Ok(default),
    }
}
