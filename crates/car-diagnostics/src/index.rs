//! In-memory embedding index over symptom names.
//!
//! Every symptom name is encoded once, in a single batched call, when the index is built.
//! Queries encode the free text and compare it against every stored vector with cosine
//! similarity. The catalog is small (tens to hundreds of symptoms), so a linear scan is
//! all that is needed.

use std::sync::Arc;

use tracing::{debug, info};

use crate::model::Symptom;
use diag_common::embedding::TextEncoder;
use diag_common::error::CommonError;

/// Minimum similarity a hit must reach unless the caller says otherwise.
pub const DEFAULT_THRESHOLD: f32 = 0.5;

struct IndexEntry {
    symptom_id: String,
    vector: Vec<f32>,
}

/// A symptom id with its similarity to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredSymptom {
    pub symptom_id: String,
    pub score: f32,
}

pub struct SymptomIndex {
    encoder: Arc<dyn TextEncoder>,
    entries: Vec<IndexEntry>,
}

impl SymptomIndex {
    /// Encode every symptom name and build the index.
    pub fn build(encoder: Arc<dyn TextEncoder>, symptoms: &[Symptom]) -> Result<Self, CommonError> {
        let mut index = Self {
            encoder,
            entries: Vec::new(),
        };
        index.rebuild(symptoms)?;
        Ok(index)
    }

    /// Replace the whole mapping with fresh vectors for `symptoms`.
    ///
    /// On error the previous entries are left untouched.
    pub fn rebuild(&mut self, symptoms: &[Symptom]) -> Result<(), CommonError> {
        if symptoms.is_empty() {
            self.entries.clear();
            return Ok(());
        }

        let names: Vec<String> = symptoms.iter().map(|s| s.name.clone()).collect();
        let vectors = self.encoder.encode(&names)?;
        if vectors.len() != symptoms.len() {
            return Err(CommonError::Embedding(format!(
                "expected {} vectors, encoder returned {}",
                symptoms.len(),
                vectors.len()
            )));
        }

        self.entries = symptoms
            .iter()
            .zip(vectors)
            .map(|(symptom, vector)| IndexEntry {
                symptom_id: symptom.id.clone(),
                vector,
            })
            .collect();

        info!(vectors = self.len(), "symptom index built");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the symptoms closest to `text`.
    ///
    /// Blank text returns no hits without touching the model. Hits below `threshold` are
    /// dropped; the rest are ranked by similarity (ties by symptom id) and cut to `top_k`.
    pub fn query(
        &self,
        text: &str,
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<ScoredSymptom>, CommonError> {
        let text = text.trim();
        if text.is_empty() || top_k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self.encoder.encode_query(text)?;

        let mut hits: Vec<ScoredSymptom> = self
            .entries
            .iter()
            .map(|entry| ScoredSymptom {
                symptom_id: entry.symptom_id.clone(),
                score: cosine_similarity(&query_vector, &entry.vector),
            })
            .filter(|hit| hit.score >= threshold)
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.symptom_id.cmp(&b.symptom_id))
        });
        hits.truncate(top_k);

        debug!(query = text, hits = hits.len(), "symptom index query");
        Ok(hits)
    }
}

/// Cosine of the angle between two vectors, in [-1, 1].
///
/// Returns 0.0 when the dimensions differ or either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_symptoms, FailingEncoder, FakeEncoder};

    fn index() -> (Arc<FakeEncoder>, SymptomIndex) {
        let encoder = Arc::new(FakeEncoder::new());
        let index = SymptomIndex::build(encoder.clone(), &sample_symptoms()).unwrap();
        (encoder, index)
    }

    #[test]
    fn cosine_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 3.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 1.0], &[-1.0, -1.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn build_encodes_all_names_in_one_call() {
        let (encoder, index) = index();
        assert_eq!(index.len(), sample_symptoms().len());
        assert_eq!(encoder.batch_calls(), 1);
    }

    #[test]
    fn rebuild_replaces_entries() {
        let (encoder, mut index) = index();
        let symptoms = sample_symptoms();
        index.rebuild(&symptoms[..2]).unwrap();
        assert_eq!(index.len(), 2);
        index.rebuild(&symptoms).unwrap();
        assert_eq!(index.len(), symptoms.len());
        assert_eq!(encoder.batch_calls(), 3);
    }

    #[test]
    fn blank_query_skips_the_model() {
        let (encoder, index) = index();
        let before = encoder.batch_calls();
        assert!(index.query("", 5, DEFAULT_THRESHOLD).unwrap().is_empty());
        assert!(index.query("   \t", 5, DEFAULT_THRESHOLD).unwrap().is_empty());
        assert_eq!(encoder.batch_calls(), before);
    }

    #[test]
    fn exact_name_ranks_first() {
        let (_, index) = index();
        let hits = index.query("Black exhaust smoke", 3, DEFAULT_THRESHOLD).unwrap();
        assert_eq!(hits[0].symptom_id, "fumee_noire");
        assert!((hits[0].score - 1.0).abs() < 1e-5);
    }

    #[test]
    fn respects_top_k_and_threshold() {
        let (_, index) = index();
        let all = index.query("engine smoke noise leak", 50, 0.0).unwrap();
        for k in [1, 2, 3] {
            let hits = index.query("engine smoke noise leak", k, 0.0).unwrap();
            assert!(hits.len() <= k);
            assert_eq!(hits[..], all[..hits.len()]);
        }
        for threshold in [0.1, 0.3, 0.5, 0.9] {
            let hits = index.query("engine smoke noise leak", 50, threshold).unwrap();
            assert!(hits.iter().all(|h| h.score >= threshold));
        }
        assert!(index.query("engine smoke", 0, 0.0).unwrap().is_empty());
    }

    #[test]
    fn ties_break_by_symptom_id() {
        let encoder = Arc::new(FakeEncoder::new());
        let mut symptoms = sample_symptoms();
        symptoms[0].name = "same text".to_string();
        symptoms[1].name = "same text".to_string();
        let index = SymptomIndex::build(encoder, &symptoms).unwrap();
        let hits = index.query("same text", 2, DEFAULT_THRESHOLD).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].score, hits[1].score);
        assert!(hits[0].symptom_id < hits[1].symptom_id);
    }

    #[test]
    fn encoder_failure_propagates() {
        let err = SymptomIndex::build(Arc::new(FailingEncoder), &sample_symptoms());
        assert!(matches!(err, Err(CommonError::Embedding(_))));
    }
}
