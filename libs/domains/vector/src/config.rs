use core_config::{ConfigError, FromEnv, env_or_default, env_parse_or};

/// Defaults applied by callers of the retrieval service
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    pub default_namespace: String,
    pub default_top_k: usize,
    /// Texts per embedding request when indexing
    pub batch_size: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_namespace: "contacts".to_string(),
            default_top_k: 10,
            batch_size: 100,
        }
    }
}

impl FromEnv for RetrievalConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let batch_size: usize = env_parse_or("EMBEDDING_BATCH_SIZE", 100)?;
        if batch_size == 0 {
            return Err(ConfigError::ParseError {
                key: "EMBEDDING_BATCH_SIZE".to_string(),
                details: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            default_namespace: env_or_default("VECTOR_DEFAULT_NAMESPACE", "contacts"),
            default_top_k: env_parse_or("VECTOR_DEFAULT_TOP_K", 10)?,
            batch_size,
        })
    }
}
