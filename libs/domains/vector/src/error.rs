use core_config::ConfigError;
use http::StatusCode;
use thiserror::Error;

/// How a caller should react to a failed operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Transient; the same request may succeed later
    Retry,
    /// Credentials were rejected; obtain new ones first
    Reauthenticate,
    /// Deployment problem; retrying will not help
    Operator,
    /// The request itself is invalid
    Caller,
}

#[derive(Debug, Error)]
pub enum VectorError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Vector store error: {0}")]
    Store(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type VectorResult<T> = Result<T, VectorError>;

impl VectorError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            VectorError::Validation(_) => StatusCode::BAD_REQUEST,
            VectorError::Store(_) | VectorError::Embedding(_) => StatusCode::BAD_GATEWAY,
            VectorError::Config(_) | VectorError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            VectorError::Validation(_) => ErrorClass::Caller,
            VectorError::Store(_) | VectorError::Embedding(_) => ErrorClass::Retry,
            VectorError::Config(_) | VectorError::Internal(_) => ErrorClass::Operator,
        }
    }
}

impl From<qdrant_client::QdrantError> for VectorError {
    fn from(err: qdrant_client::QdrantError) -> Self {
        VectorError::Store(err.to_string())
    }
}

impl From<reqwest::Error> for VectorError {
    fn from(err: reqwest::Error) -> Self {
        VectorError::Embedding(err.to_string())
    }
}

impl From<serde_json::Error> for VectorError {
    fn from(err: serde_json::Error) -> Self {
        VectorError::Internal(format!("JSON error: {}", err))
    }
}

impl From<ConfigError> for VectorError {
    fn from(err: ConfigError) -> Self {
        VectorError::Config(err.to_string())
    }
}
