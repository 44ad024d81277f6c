/// Error types shared across the diagnostics server crates.
///
/// These errors represent failures in infrastructure components (the embedding model)
/// that are common to every server. Application-specific errors should be defined
/// in each server crate and wrap `CommonError` via `#[from]`.

#[derive(Debug, thiserror::Error)]
pub enum CommonError {
    #[error("embedding model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("embedding error: {0}")]
    Embedding(String),
}
