/// Embedding wrapper around fastembed.
///
/// `TextEmbedding` from fastembed is synchronous and CPU-bound. The `TextEncoder` trait is
/// therefore synchronous too; async callers dispatch through `tokio::task::spawn_blocking`.
///
/// Some models use task-prefixed inputs (nomic-embed-text-v1.5):
/// - Documents: "search_document: {text}"
/// - Queries: "search_query: {text}"
///
/// The prefixes are applied here so callers only ever pass raw text.
use std::sync::Arc;

use crate::error::CommonError;

/// Capability to map text into a shared fixed-dimension vector space.
///
/// Implementations must return exactly one vector per input, in input order, and must be
/// deterministic for identical input.
pub trait TextEncoder: Send + Sync {
    /// Encode catalog texts in a single batched call.
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CommonError>;

    /// Encode one free-form query.
    fn encode_query(&self, text: &str) -> Result<Vec<f32>, CommonError> {
        self.encode(&[text.to_string()])?
            .pop()
            .ok_or_else(|| CommonError::Embedding("empty embedding result".to_string()))
    }
}

/// Supported sentence-embedding models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingModelKind {
    /// sentence-transformers/all-MiniLM-L6-v2 (384 dims, no prefixes).
    AllMiniLmL6V2,
    /// nomic-embed-text-v1.5 (768 dims, task prefixes).
    NomicEmbedTextV15,
}

impl EmbeddingModelKind {
    /// Parse a model name as accepted in configuration (case-insensitive).
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "all-minilm-l6-v2" | "minilm" => Some(Self::AllMiniLmL6V2),
            "nomic-embed-text-v1.5" | "nomic" => Some(Self::NomicEmbedTextV15),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::AllMiniLmL6V2 => "all-minilm-l6-v2",
            Self::NomicEmbedTextV15 => "nomic-embed-text-v1.5",
        }
    }

    /// Returns the dimensionality of the embedding vectors.
    pub fn dimensions(self) -> usize {
        match self {
            Self::AllMiniLmL6V2 => 384,
            Self::NomicEmbedTextV15 => 768,
        }
    }

    fn document_prefix(self) -> &'static str {
        match self {
            Self::AllMiniLmL6V2 => "",
            Self::NomicEmbedTextV15 => "search_document: ",
        }
    }

    fn query_prefix(self) -> &'static str {
        match self {
            Self::AllMiniLmL6V2 => "",
            Self::NomicEmbedTextV15 => "search_query: ",
        }
    }

    fn fastembed_model(self) -> fastembed::EmbeddingModel {
        match self {
            Self::AllMiniLmL6V2 => fastembed::EmbeddingModel::AllMiniLML6V2,
            Self::NomicEmbedTextV15 => fastembed::EmbeddingModel::NomicEmbedTextV15,
        }
    }
}

impl Default for EmbeddingModelKind {
    fn default() -> Self {
        Self::AllMiniLmL6V2
    }
}

/// Wraps fastembed's `TextEmbedding` model for generating vector embeddings.
pub struct Embedder {
    model: Arc<fastembed::TextEmbedding>,
    kind: EmbeddingModelKind,
}

impl Embedder {
    /// Initialize the embedding model.
    ///
    /// This downloads the model on first run. The download and ONNX session setup happen
    /// inside a blocking task. Any failure is reported as `ModelUnavailable`.
    pub async fn new(kind: EmbeddingModelKind) -> Result<Self, CommonError> {
        let model = tokio::task::spawn_blocking(move || {
            let options = fastembed::InitOptions::new(kind.fastembed_model())
                .with_show_download_progress(true);
            fastembed::TextEmbedding::try_new(options)
        })
        .await
        .map_err(|e| CommonError::ModelUnavailable(format!("spawn_blocking join error: {e}")))?
        .map_err(|e| {
            CommonError::ModelUnavailable(format!("{} initialization failed: {e}", kind.name()))
        })?;

        Ok(Self {
            model: Arc::new(model),
            kind,
        })
    }

    pub fn dimensions(&self) -> usize {
        self.kind.dimensions()
    }
}

impl TextEncoder for Embedder {
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CommonError> {
        let prefix = self.kind.document_prefix();
        let prefixed: Vec<String> = texts.iter().map(|t| format!("{prefix}{t}")).collect();
        self.model
            .embed(prefixed, None)
            .map_err(|e| CommonError::Embedding(format!("document embedding failed: {e}")))
    }

    fn encode_query(&self, text: &str) -> Result<Vec<f32>, CommonError> {
        let prefixed = vec![format!("{}{text}", self.kind.query_prefix())];
        let mut results = self
            .model
            .embed(prefixed, None)
            .map_err(|e| CommonError::Embedding(format!("query embedding failed: {e}")))?;
        results
            .pop()
            .ok_or_else(|| CommonError::Embedding("empty embedding result".to_string()))
    }
}
