//! Diagnostic service: the three core operations over a loaded catalog and its index.
//!
//! Built once at startup by [`DiagnosticService::bootstrap`]; afterwards every field is
//! read-only and shared through `Arc`, so concurrent calls need no locking.

use std::sync::Arc;

use tracing::{error, info};

use crate::catalog::Catalog;
use crate::config::Config;
use crate::engine::{DiagnosisResult, DiagnosticEngine};
use crate::error::AppError;
use crate::index::SymptomIndex;
use crate::model::{round_to, Symptom, SymptomMatch};
use diag_common::embedding::{Embedder, TextEncoder};
use diag_common::error::CommonError;

pub struct DiagnosticService {
    catalog: Arc<Catalog>,
    index: SymptomIndex,
    engine: DiagnosticEngine,
    search_threshold: f32,
}

impl DiagnosticService {
    pub fn new(
        catalog: Arc<Catalog>,
        index: SymptomIndex,
        engine: DiagnosticEngine,
        search_threshold: f32,
    ) -> Self {
        Self {
            catalog,
            index,
            engine,
            search_threshold,
        }
    }

    /// Load the catalog, the embedding model and build the index.
    pub async fn bootstrap(config: &Config) -> Result<Self, AppError> {
        let catalog = Catalog::load(&config.catalog_sources()).inspect_err(|e| {
            error!(file = %e.path().display(), error = %e, "catalog rejected");
        })?;
        let catalog = Arc::new(catalog);

        info!(
            model = config.embedding_model.name(),
            "initializing embedding model (may download on first run)"
        );
        let embedder = Embedder::new(config.embedding_model).await?;
        info!(dimensions = embedder.dimensions(), "embedding model ready");

        Self::with_encoder(config, catalog, Arc::new(embedder)).await
    }

    /// Build the index with an already constructed encoder.
    pub async fn with_encoder(
        config: &Config,
        catalog: Arc<Catalog>,
        encoder: Arc<dyn TextEncoder>,
    ) -> Result<Self, AppError> {
        let index = {
            let catalog = Arc::clone(&catalog);
            tokio::task::spawn_blocking(move || SymptomIndex::build(encoder, catalog.symptoms()))
                .await
                .map_err(|e| CommonError::Embedding(format!("index build task failed: {e}")))??
        };

        let engine = DiagnosticEngine::new(
            Arc::clone(&catalog),
            config.thresholds,
            config.cost_currency.clone(),
        );
        Ok(Self::new(catalog, index, engine, config.search_threshold))
    }

    /// Every catalog symptom in load order.
    pub fn list_symptoms(&self) -> Vec<Symptom> {
        self.catalog.symptoms().to_vec()
    }

    /// Symptoms semantically close to `text`, best first, similarity rounded to three
    /// decimals. Blocking: encodes the query on the calling thread.
    pub fn search_symptoms(&self, text: &str, top_k: usize) -> Result<Vec<SymptomMatch>, CommonError> {
        let hits = self.index.query(text, top_k, self.search_threshold)?;
        Ok(hits
            .into_iter()
            .filter_map(|hit| {
                self.catalog.symptom(&hit.symptom_id).map(|symptom| SymptomMatch {
                    symptom: symptom.clone(),
                    similarity_score: round_to(f64::from(hit.score), 3) as f32,
                })
            })
            .collect())
    }

    pub fn diagnose(&self, symptom_ids: &[String]) -> DiagnosisResult {
        self.engine.diagnose(symptom_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_catalog, FakeEncoder};

    async fn service() -> DiagnosticService {
        let config = Config::from_lookup(|_| None).unwrap();
        DiagnosticService::with_encoder(
            &config,
            Arc::new(sample_catalog()),
            Arc::new(FakeEncoder::new()),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn lists_catalog_in_order() {
        let service = service().await;
        let symptoms = service.list_symptoms();
        assert_eq!(symptoms.len(), 7);
        assert_eq!(symptoms[0].id, "fumee_noire");
    }

    #[tokio::test]
    async fn blank_search_is_empty() {
        let service = service().await;
        assert!(service.search_symptoms("", 5).unwrap().is_empty());
        assert!(service.search_symptoms("   ", 5).unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_maps_hits_to_symptoms() {
        let service = service().await;
        let hits = service.search_symptoms("engine overheating", 5).unwrap();
        assert_eq!(hits[0].symptom.id, "surchauffe_moteur");
        assert_eq!(hits[0].similarity_score, 1.0);
        assert!(hits.len() <= 5);
        assert!(hits.iter().all(|h| h.similarity_score >= 0.5));
    }

    #[tokio::test]
    async fn diagnose_delegates_to_engine() {
        let service = service().await;
        let result = service.diagnose(&["fumee_noire".to_string()]);
        let report = result.report().unwrap();
        assert_eq!(report.rule_id.as_deref(), Some("injection"));
        assert_eq!(report.score, 0.25);
    }
}
