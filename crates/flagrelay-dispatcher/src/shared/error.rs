use flagrelay_core::{CoreError, ErrorResponse};
use thiserror::Error;

/// Dispatcher specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    #[error("Unknown addon provider {0}")]
    UnknownProvider(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Addon not found: {0}")]
    AddonNotFound(u64),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl From<CoreError> for DispatcherError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::UnknownProvider(name) => DispatcherError::UnknownProvider(name),
            CoreError::Validation(msg) => DispatcherError::ValidationError(msg),
            CoreError::DuplicateProvider(name) => {
                DispatcherError::ConfigurationError(format!("duplicate provider {name}"))
            }
            CoreError::Serialization(msg) => DispatcherError::InvalidRequest(msg),
            // Delivery failures are recorded on outcomes, not returned
            other => DispatcherError::InvalidRequest(other.to_string()),
        }
    }
}

impl From<DispatcherError> for ErrorResponse {
    fn from(err: DispatcherError) -> Self {
        let code = match &err {
            DispatcherError::UnknownProvider(_) => "UNKNOWN_PROVIDER",
            DispatcherError::ValidationError(_) => "VALIDATION_ERROR",
            DispatcherError::AddonNotFound(_) => "ADDON_NOT_FOUND",
            DispatcherError::StorageError(_) => "STORAGE_ERROR",
            DispatcherError::InvalidRequest(_) => "INVALID_REQUEST",
            DispatcherError::ConfigurationError(_) => "CONFIGURATION_ERROR",
        };

        ErrorResponse::new(code, err.to_string())
    }
}

pub type DispatcherResult<T> = std::result::Result<T, DispatcherError>;
