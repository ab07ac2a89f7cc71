use core_config::ConfigError;
use domain_vector::{ErrorClass, VectorError};
use http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContactsError {
    /// The contacts provider call failed, timed out or returned garbage
    #[error("Upstream error{}: {message}", .status.map(|s| format!(" ({})", s)).unwrap_or_default())]
    Upstream {
        status: Option<u16>,
        message: String,
    },

    /// Upstream failed and nothing was cached to fall back on
    #[error("Contacts unavailable for '{owner}' and no cached copy exists: {reason}")]
    UpstreamUnavailable {
        owner: String,
        status: Option<u16>,
        reason: String,
    },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Vector index error: {0}")]
    Vector(#[from] VectorError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ContactsResult<T> = Result<T, ContactsError>;

fn is_credential_rejection(status: Option<u16>) -> bool {
    matches!(status, Some(401) | Some(403))
}

impl ContactsError {
    /// HTTP status of the upstream response, when there was one
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            ContactsError::Upstream { status, .. }
            | ContactsError::UpstreamUnavailable { status, .. } => *status,
            _ => None,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ContactsError::Upstream { .. } | ContactsError::UpstreamUnavailable { .. } => {
                StatusCode::BAD_GATEWAY
            }
            ContactsError::Auth(_) => StatusCode::UNAUTHORIZED,
            ContactsError::Validation(_) => StatusCode::BAD_REQUEST,
            ContactsError::Vector(err) => err.status_code(),
            ContactsError::Config(_) | ContactsError::Cache(_) | ContactsError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Whether the client should retry, re-authenticate or alert an operator
    pub fn class(&self) -> ErrorClass {
        match self {
            ContactsError::Upstream { status, .. }
            | ContactsError::UpstreamUnavailable { status, .. } => {
                if is_credential_rejection(*status) {
                    ErrorClass::Reauthenticate
                } else {
                    ErrorClass::Retry
                }
            }
            ContactsError::Auth(_) => ErrorClass::Reauthenticate,
            ContactsError::Validation(_) => ErrorClass::Caller,
            ContactsError::Cache(_) => ErrorClass::Retry,
            ContactsError::Vector(err) => err.class(),
            ContactsError::Config(_) | ContactsError::Internal(_) => ErrorClass::Operator,
        }
    }
}

impl From<reqwest::Error> for ContactsError {
    fn from(err: reqwest::Error) -> Self {
        ContactsError::Upstream {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

impl From<redis::RedisError> for ContactsError {
    fn from(err: redis::RedisError) -> Self {
        ContactsError::Cache(err.to_string())
    }
}

impl From<serde_json::Error> for ContactsError {
    fn from(err: serde_json::Error) -> Self {
        ContactsError::Internal(format!("JSON error: {}", err))
    }
}

impl From<ConfigError> for ContactsError {
    fn from(err: ConfigError) -> Self {
        ContactsError::Config(err.to_string())
    }
}
