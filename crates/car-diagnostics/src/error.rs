use diag_common::error::CommonError;

use crate::catalog::CatalogError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Common(#[from] CommonError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("config error: {0}")]
    Config(String),
}
