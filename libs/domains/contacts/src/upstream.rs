use std::time::Duration;

use async_trait::async_trait;
use core_config::{ConfigError, FromEnv, env_or_default, env_parse_or};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ContactsError, ContactsResult};

const DEFAULT_BASE_URL: &str = "https://people.googleapis.com/v1";
const PERSON_FIELDS: &str =
    "names,emailAddresses,phoneNumbers,photos,organizations,addresses,biographies";

/// Authenticated fetch of one owner's raw contact entries
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UpstreamFetch: Send + Sync {
    async fn fetch(&self) -> ContactsResult<Vec<Value>>;
}

/// Google People API client configuration
#[derive(Debug, Clone)]
pub struct GoogleContactsConfig {
    pub base_url: String,
    pub page_size: u32,
    /// Pagination stops after this many pages even if more remain
    pub max_pages: u32,
    pub timeout_secs: u64,
}

impl GoogleContactsConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }
}

impl Default for GoogleContactsConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            page_size: 1000,
            max_pages: 10,
            timeout_secs: 30,
        }
    }
}

impl FromEnv for GoogleContactsConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: env_or_default("GOOGLE_PEOPLE_BASE_URL", DEFAULT_BASE_URL),
            page_size: env_parse_or("GOOGLE_PEOPLE_PAGE_SIZE", 1000)?,
            max_pages: env_parse_or("GOOGLE_PEOPLE_MAX_PAGES", 10)?,
            timeout_secs: env_parse_or("UPSTREAM_TIMEOUT_SECS", 30)?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectionsPage {
    #[serde(default)]
    connections: Vec<Value>,
    next_page_token: Option<String>,
}

/// Google People API `people/me/connections` client
#[derive(Clone)]
pub struct GoogleContactsClient {
    client: Client,
    config: GoogleContactsConfig,
}

impl GoogleContactsClient {
    pub fn new(config: GoogleContactsConfig) -> ContactsResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ContactsError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// All connections visible to `access_token`, following pagination
    pub async fn list_connections(&self, access_token: &str) -> ContactsResult<Vec<Value>> {
        let url = format!(
            "{}/people/me/connections",
            self.config.base_url.trim_end_matches('/')
        );
        let page_size = self.config.page_size.to_string();

        let mut connections = Vec::new();
        let mut page_token: Option<String> = None;

        for page in 1..=self.config.max_pages.max(1) {
            let mut query = vec![
                ("personFields", PERSON_FIELDS),
                ("pageSize", page_size.as_str()),
            ];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }

            let response = self
                .client
                .get(&url)
                .bearer_auth(access_token)
                .header(reqwest::header::ACCEPT, "application/json")
                .query(&query)
                .send()
                .await?;

            let status = response.status();
            if status == StatusCode::UNAUTHORIZED {
                return Err(ContactsError::Upstream {
                    status: Some(status.as_u16()),
                    message: "access token expired or invalid".to_string(),
                });
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ContactsError::Upstream {
                    status: Some(status.as_u16()),
                    message: format!("Google API error: {}", body),
                });
            }

            let body = response.bytes().await?;
            let parsed: ConnectionsPage =
                serde_json::from_slice(&body).map_err(|e| ContactsError::Upstream {
                    status: Some(status.as_u16()),
                    message: format!("Malformed connections response: {}", e),
                })?;

            debug!(page, count = parsed.connections.len(), "Fetched connections page");
            connections.extend(parsed.connections);

            page_token = parsed.next_page_token.filter(|t| !t.is_empty());
            if page_token.is_none() {
                return Ok(connections);
            }
        }

        warn!(
            max_pages = self.config.max_pages,
            fetched = connections.len(),
            "Stopped paginating connections at page limit"
        );
        Ok(connections)
    }

    /// Bind an access token, producing the fetch capability for one owner
    pub fn for_token(&self, access_token: impl Into<String>) -> GoogleConnectionsFetch {
        GoogleConnectionsFetch {
            client: self.clone(),
            access_token: access_token.into(),
        }
    }
}

/// [`UpstreamFetch`] over a [`GoogleContactsClient`] and one access token
pub struct GoogleConnectionsFetch {
    client: GoogleContactsClient,
    access_token: String,
}

#[async_trait]
impl UpstreamFetch for GoogleConnectionsFetch {
    async fn fetch(&self) -> ContactsResult<Vec<Value>> {
        self.client.list_connections(&self.access_token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GoogleContactsClient {
        GoogleContactsClient::new(GoogleContactsConfig::default().with_base_url(server.uri()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_sends_fields_and_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/people/me/connections"))
            .and(header("authorization", "Bearer ya29.token"))
            .and(query_param("personFields", PERSON_FIELDS))
            .and(query_param("pageSize", "50"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "connections": [{"resourceName": "people/c1"}],
                "totalPeople": 1
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = GoogleContactsClient::new(
            GoogleContactsConfig::default()
                .with_base_url(server.uri())
                .with_page_size(50),
        )
        .unwrap();

        let fetched = client.for_token("ya29.token").fetch().await.unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0]["resourceName"], "people/c1");
    }

    #[tokio::test]
    async fn test_follows_next_page_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/people/me/connections"))
            .and(query_param("pageToken", "page-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "connections": [{"resourceName": "people/c2"}]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/people/me/connections"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "connections": [{"resourceName": "people/c1"}],
                "nextPageToken": "page-2"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let fetched = client(&server).list_connections("t").await.unwrap();
        let ids: Vec<&str> = fetched
            .iter()
            .filter_map(|c| c["resourceName"].as_str())
            .collect();
        assert_eq!(ids, vec!["people/c1", "people/c2"]);
    }

    #[tokio::test]
    async fn test_stops_at_page_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "connections": [{"resourceName": "people/loop"}],
                "nextPageToken": "again"
            })))
            .expect(2)
            .mount(&server)
            .await;

        let client = GoogleContactsClient::new(
            GoogleContactsConfig::default()
                .with_base_url(server.uri())
                .with_max_pages(2),
        )
        .unwrap();

        assert_eq!(client.list_connections("t").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_account_has_no_connections_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"totalPeople": 0})))
            .mount(&server)
            .await;

        assert!(client(&server).list_connections("t").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unauthorized_is_upstream_error_with_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client(&server).list_connections("expired").await.unwrap_err();
        assert_eq!(err.upstream_status(), Some(401));
        assert!(err.to_string().contains("access token expired or invalid"));
    }

    #[tokio::test]
    async fn test_server_error_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("backend unavailable"))
            .mount(&server)
            .await;

        let err = client(&server).list_connections("t").await.unwrap_err();
        assert!(matches!(err, ContactsError::Upstream { status: Some(503), .. }));
    }

    #[tokio::test]
    async fn test_malformed_json_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client(&server).list_connections("t").await.unwrap_err();
        assert!(matches!(err, ContactsError::Upstream { .. }));
    }

    #[test]
    fn test_config_from_env_defaults() {
        temp_env::with_vars(
            [
                ("GOOGLE_PEOPLE_BASE_URL", None::<&str>),
                ("GOOGLE_PEOPLE_PAGE_SIZE", None),
                ("GOOGLE_PEOPLE_MAX_PAGES", None),
                ("UPSTREAM_TIMEOUT_SECS", Some("5")),
            ],
            || {
                let config = GoogleContactsConfig::from_env().unwrap();
                assert_eq!(config.base_url, "https://people.googleapis.com/v1");
                assert_eq!(config.page_size, 1000);
                assert_eq!(config.max_pages, 10);
                assert_eq!(config.timeout_secs, 5);
            },
        );
    }
}
