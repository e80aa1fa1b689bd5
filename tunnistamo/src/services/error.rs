use service_core::error::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] AppError),

    #[error("Token signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    PermissionDenied(String),

    #[error("{0}")]
    Validation(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Store(e) => e,
            ServiceError::Signing(e) => AppError::TokenError(e),
            ServiceError::Internal(e) => AppError::InternalError(e),
            ServiceError::NotFound(e) => AppError::NotFound(anyhow::anyhow!(e)),
            ServiceError::PermissionDenied(e) => AppError::Forbidden(anyhow::anyhow!(e)),
            ServiceError::Validation(e) => AppError::BadRequest(anyhow::anyhow!(e)),
        }
    }
}
