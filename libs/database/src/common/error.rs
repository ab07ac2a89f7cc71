/// Error type for cache store connectivity
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Connection could not be established after all retries
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Health check failed: {0}")]
    HealthCheckFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl DatabaseError {
    /// True when the failure is likely transient and a later attempt may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            #[cfg(feature = "redis")]
            DatabaseError::Redis(e) => {
                e.is_io_error() || e.is_timeout() || e.is_connection_dropped()
            }
            DatabaseError::ConnectionFailed(_) | DatabaseError::HealthCheckFailed(_) => true,
            DatabaseError::ConfigError(_) => false,
        }
    }
}

/// Result type alias for store operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;
