#[cfg(feature = "config")]
use core_config::{ConfigError, FromEnv, env_optional, env_parse_or};

/// Redis connection settings.
///
/// Credentials and database number may either be embedded in `url` or
/// supplied separately; [`RedisConfig::build_url`] merges them.
#[derive(Clone, Debug)]
pub struct RedisConfig {
    /// Connection URL, e.g. `redis://127.0.0.1:6379`
    pub url: String,

    /// Logical database index
    pub database: Option<u8>,

    /// Username for Redis ACL
    pub username: Option<String>,

    pub password: Option<String>,
}

impl RedisConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            database: None,
            username: None,
            password: None,
        }
    }

    pub fn with_database(mut self, database: u8) -> Self {
        self.database = Some(database);
        self
    }

    pub fn with_credentials(mut self, username: Option<String>, password: Option<String>) -> Self {
        self.username = username;
        self.password = password;
        self
    }

    /// Full connection string.
    ///
    /// Credentials already present in `url` win over the separate fields.
    /// A configured `database` replaces any path in `url`.
    pub fn build_url(&self) -> String {
        let Some((scheme, rest)) = self.url.split_once("://") else {
            return self.url.clone();
        };

        let (authority, path) = match rest.split_once('/') {
            Some((authority, path)) => (authority, Some(path)),
            None => (rest, None),
        };

        let authority = if authority.contains('@') {
            authority.to_string()
        } else {
            match (&self.username, &self.password) {
                (user, Some(password)) => format!(
                    "{}:{}@{}",
                    user.as_deref().unwrap_or(""),
                    password,
                    authority
                ),
                (Some(user), None) => format!("{}@{}", user, authority),
                (None, None) => authority.to_string(),
            }
        };

        match (self.database, path) {
            (Some(db), _) => format!("{}://{}/{}", scheme, authority, db),
            (None, Some(path)) if !path.is_empty() => format!("{}://{}/{}", scheme, authority, path),
            _ => format!("{}://{}", scheme, authority),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self::new("redis://127.0.0.1:6379")
    }
}

/// Environment variables:
/// - `REDIS_URL` or `REDIS_HOST` (required)
/// - `REDIS_DATABASE` (optional, 0-15)
/// - `REDIS_USERNAME`, `REDIS_PASSWORD` (optional)
#[cfg(feature = "config")]
impl FromEnv for RedisConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let url = env_optional("REDIS_URL")
            .or_else(|| env_optional("REDIS_HOST"))
            .ok_or_else(|| ConfigError::MissingEnvVar("REDIS_URL or REDIS_HOST".to_string()))?;

        let database = match env_optional("REDIS_DATABASE") {
            Some(_) => Some(env_parse_or("REDIS_DATABASE", 0u8)?),
            None => None,
        };

        Ok(Self {
            url,
            database,
            username: env_optional("REDIS_USERNAME"),
            password: env_optional("REDIS_PASSWORD"),
        })
    }
}
