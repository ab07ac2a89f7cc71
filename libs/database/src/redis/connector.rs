use redis::Client;
use redis::aio::ConnectionManager;
use tracing::info;

use crate::common::{DatabaseError, DatabaseResult, RetryConfig, retry, retry_with_backoff};

/// Open a [`ConnectionManager`] and verify it with `PING`.
///
/// The manager reconnects on its own after the initial handshake, so callers
/// clone it freely instead of pooling.
pub async fn connect(url: &str) -> DatabaseResult<ConnectionManager> {
    info!(url = %redact(url), "Connecting to Redis");

    let client = Client::open(url)?;
    let manager = ConnectionManager::new(client).await?;

    let mut conn = manager.clone();
    let _: String = redis::cmd("PING").query_async(&mut conn).await?;

    info!("Connected to Redis");
    Ok(manager)
}

/// Connect with exponential backoff.
///
/// `None` uses the default policy (3 retries from 100ms). Exhausting the
/// budget yields [`DatabaseError::ConnectionFailed`].
pub async fn connect_with_retry(
    url: &str,
    retry_config: Option<RetryConfig>,
) -> DatabaseResult<ConnectionManager> {
    let url_owned = url.to_string();

    let result = match retry_config {
        Some(config) => retry_with_backoff(|| connect(&url_owned), config).await,
        None => retry(|| connect(&url_owned)).await,
    };

    result.map_err(|e| DatabaseError::ConnectionFailed(format!("{}: {}", redact(url), e)))
}

/// Hide the password portion of a connection URL for logging
fn redact(url: &str) -> String {
    match (url.split_once("://"), url.rfind('@')) {
        (Some((scheme, rest)), Some(_)) => {
            let (credentials, host) = rest.rsplit_once('@').unwrap_or(("", rest));
            match credentials.split_once(':') {
                Some((user, _)) => format!("{}://{}:***@{}", scheme, user, host),
                None => format!("{}://{}@{}", scheme, credentials, host),
            }
        }
        _ => url.to_string(),
    }
}
