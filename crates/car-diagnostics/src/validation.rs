//! Request validation for the tool layer. Rejected requests never reach the engine.

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("between {min} and {max} symptoms are required, got {got}")]
    SymptomCount { min: usize, max: usize, got: usize },

    #[error("no valid symptom supplied")]
    NoSymptoms,

    #[error("search text must be between {min} and {max} characters, got {got}")]
    SearchTextLength { min: usize, max: usize, got: usize },
}

/// Size limits applied to incoming requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLimits {
    pub min_symptoms: usize,
    pub max_symptoms: usize,
    pub search_min_chars: usize,
    pub search_max_chars: usize,
    pub max_top_k: usize,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            min_symptoms: 1,
            max_symptoms: 5,
            search_min_chars: 3,
            search_max_chars: 200,
            max_top_k: 20,
        }
    }
}

impl RequestLimits {
    /// Check the symptom count, then trim ids and drop blank ones.
    pub fn validate_diagnose(&self, symptoms: &[String]) -> Result<Vec<String>, ValidationError> {
        if symptoms.len() < self.min_symptoms || symptoms.len() > self.max_symptoms {
            return Err(ValidationError::SymptomCount {
                min: self.min_symptoms,
                max: self.max_symptoms,
                got: symptoms.len(),
            });
        }

        let cleaned: Vec<String> = symptoms
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        if cleaned.is_empty() {
            return Err(ValidationError::NoSymptoms);
        }
        Ok(cleaned)
    }

    /// Trim the search text and check its length in characters.
    pub fn validate_search(&self, text: &str) -> Result<String, ValidationError> {
        let text = text.trim();
        let len = text.chars().count();
        if len == 0 || len < self.search_min_chars || len > self.search_max_chars {
            return Err(ValidationError::SearchTextLength {
                min: self.search_min_chars,
                max: self.search_max_chars,
                got: len,
            });
        }
        Ok(text.to_string())
    }

    /// Requested result count, falling back to `default` and clamped to `1..=max_top_k`.
    pub fn top_k(&self, requested: Option<u32>, default: usize) -> usize {
        requested
            .map(|k| k as usize)
            .unwrap_or(default)
            .clamp(1, self.max_top_k.max(1))
    }
}
