//! Caller identity and the per-user upstream access token.
//!
//! [`AuthenticatedContacts`] ties these to the sync service: the verified
//! subject is the cache owner, and the linked Google token drives the fetch.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use core_config::{ConfigError, FromEnv, env_optional, env_or_default, env_required};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use reqwest::{Client, StatusCode};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{ContactsError, ContactsResult};
use crate::models::CacheEntry;
use crate::service::{ContactSyncService, SyncOutcome};
use crate::upstream::{GoogleContactsClient, UpstreamFetch};

const DEFAULT_CLERK_API_URL: &str = "https://api.clerk.com/v1";

/// A verified caller
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub subject: String,
    pub claims: Map<String, Value>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Fails with [`ContactsError::Auth`] on an invalid or unverifiable token
    async fn verify(&self, token: &str) -> ContactsResult<Identity>;
}

/// Supplies the provider access token linked to a subject
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UpstreamTokenSource: Send + Sync {
    async fn access_token(&self, subject: &str) -> ContactsResult<String>;
}

#[derive(Debug, Clone)]
pub struct JwtVerifierConfig {
    pub secret: String,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

impl JwtVerifierConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            issuer: None,
            audience: None,
        }
    }
}

impl FromEnv for JwtVerifierConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            secret: env_required("AUTH_JWT_SECRET")?,
            issuer: env_optional("AUTH_JWT_ISSUER"),
            audience: env_optional("AUTH_JWT_AUDIENCE"),
        })
    }
}

/// HS256 session token verifier
pub struct JwtIdentityVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtIdentityVerifier {
    pub fn new(config: &JwtVerifierConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }
        match &config.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        Self {
            key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl IdentityVerifier for JwtIdentityVerifier {
    async fn verify(&self, token: &str) -> ContactsResult<Identity> {
        let data = decode::<Map<String, Value>>(token, &self.key, &self.validation)
            .map_err(|e| ContactsError::Auth(format!("Invalid token: {}", e)))?;

        let subject = data
            .claims
            .get("sub")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ContactsError::Auth("Token has no subject".to_string()))?;

        Ok(Identity {
            subject,
            claims: data.claims,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ClerkConfig {
    pub secret_key: String,
    pub api_url: String,
    pub oauth_provider: String,
    pub timeout_secs: u64,
}

impl ClerkConfig {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            api_url: DEFAULT_CLERK_API_URL.to_string(),
            oauth_provider: "oauth_google".to_string(),
            timeout_secs: 30,
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }
}

impl FromEnv for ClerkConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            secret_key: env_required("CLERK_SECRET_KEY")?,
            api_url: env_or_default("CLERK_API_URL", DEFAULT_CLERK_API_URL),
            oauth_provider: env_or_default("CLERK_OAUTH_PROVIDER", "oauth_google"),
            timeout_secs: 30,
        })
    }
}

/// Reads a user's linked OAuth token from the Clerk backend API
pub struct ClerkTokenSource {
    client: Client,
    config: ClerkConfig,
}

impl ClerkTokenSource {
    pub fn new(config: ClerkConfig) -> ContactsResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ContactsError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }
}

/// Clerk answers with a list of tokens; older versions with a single object
fn extract_token(body: &Value) -> Option<String> {
    let token = match body {
        Value::Array(items) => items.first()?.get("token"),
        Value::Object(_) => body.get("token"),
        _ => None,
    };
    token
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl UpstreamTokenSource for ClerkTokenSource {
    async fn access_token(&self, subject: &str) -> ContactsResult<String> {
        let url = format!(
            "{}/users/{}/oauth_access_tokens/{}",
            self.config.api_url.trim_end_matches('/'),
            urlencoding::encode(subject),
            self.config.oauth_provider
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.secret_key)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::UNPROCESSABLE_ENTITY {
            return Err(ContactsError::Auth(format!(
                "No linked {} account for user",
                self.config.oauth_provider
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ContactsError::Upstream {
                status: Some(status.as_u16()),
                message: format!("Clerk API error: {}", body),
            });
        }

        let body: Value = response.json().await?;
        extract_token(&body).ok_or_else(|| {
            warn!(subject = %subject, "Clerk returned no OAuth token");
            ContactsError::Auth("Google account not connected".to_string())
        })
    }
}

/// Request flows keyed by a caller's bearer token
pub struct AuthenticatedContacts {
    verifier: Arc<dyn IdentityVerifier>,
    tokens: Arc<dyn UpstreamTokenSource>,
    provider: GoogleContactsClient,
    sync: ContactSyncService,
}

impl AuthenticatedContacts {
    pub fn new(
        verifier: Arc<dyn IdentityVerifier>,
        tokens: Arc<dyn UpstreamTokenSource>,
        provider: GoogleContactsClient,
        sync: ContactSyncService,
    ) -> Self {
        Self {
            verifier,
            tokens,
            provider,
            sync,
        }
    }

    async fn identify(&self, bearer: &str) -> ContactsResult<Identity> {
        let token = bearer.strip_prefix("Bearer ").unwrap_or(bearer).trim();
        if token.is_empty() {
            return Err(ContactsError::Auth("Missing bearer token".to_string()));
        }

        let identity = self.verifier.verify(token).await?;
        debug!(subject = %identity.subject, "Verified caller");
        Ok(identity)
    }

    /// The caller's contacts, from cache or upstream.
    ///
    /// The linked access token is looked up only when upstream is actually
    /// called, so a fresh cache entry needs nothing beyond a valid bearer.
    pub async fn contacts(&self, bearer: &str) -> ContactsResult<SyncOutcome> {
        let identity = self.identify(bearer).await?;
        let upstream = LinkedAccountFetch {
            tokens: self.tokens.as_ref(),
            provider: &self.provider,
            subject: &identity.subject,
        };

        self.sync
            .get_records_with_source(&identity.subject, &upstream)
            .await
    }

    pub async fn cached(&self, bearer: &str) -> ContactsResult<Option<CacheEntry>> {
        let identity = self.identify(bearer).await?;
        self.sync.cached_records(&identity.subject).await
    }

    pub async fn clear_cache(&self, bearer: &str) -> ContactsResult<()> {
        let identity = self.identify(bearer).await?;
        self.sync.clear_cache(&identity.subject).await
    }
}

/// Upstream fetch that resolves the subject's linked token on demand
struct LinkedAccountFetch<'a> {
    tokens: &'a dyn UpstreamTokenSource,
    provider: &'a GoogleContactsClient,
    subject: &'a str,
}

#[async_trait]
impl UpstreamFetch for LinkedAccountFetch<'_> {
    async fn fetch(&self) -> ContactsResult<Vec<Value>> {
        let access_token = self.tokens.access_token(self.subject).await?;
        self.provider.list_connections(&access_token).await
    }
}
