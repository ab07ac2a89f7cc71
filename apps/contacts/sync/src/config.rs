//! Configuration for the contacts sync CLI

use core_config::{ConfigError, Environment, FromEnv};
use database::redis::RedisConfig;
use domain_contacts::{CacheConfig, GoogleContactsConfig};
use domain_vector::{QdrantConfig, RetrievalConfig};

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    /// `None` when neither `REDIS_URL` nor `REDIS_HOST` is set
    pub redis: Option<RedisConfig>,
    pub cache: CacheConfig,
    pub google: GoogleContactsConfig,
    pub qdrant: QdrantConfig,
    pub retrieval: RetrievalConfig,
}

impl FromEnv for Config {
    fn from_env() -> Result<Self, ConfigError> {
        let redis = match RedisConfig::from_env() {
            Ok(config) => Some(config),
            Err(ConfigError::MissingEnvVar(_)) => None,
            Err(e) => return Err(e),
        };

        Ok(Self {
            environment: Environment::from_env(),
            redis,
            cache: CacheConfig::from_env()?,
            google: GoogleContactsConfig::from_env()?,
            qdrant: QdrantConfig::from_env()?,
            retrieval: RetrievalConfig::from_env()?,
        })
    }
}
