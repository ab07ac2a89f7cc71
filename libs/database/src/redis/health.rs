use std::time::{Duration, Instant};

use redis::aio::ConnectionManager;
use tracing::debug;

use crate::common::{DatabaseError, DatabaseResult};

/// Probe budget used by [`check_health_detailed`]
pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(2);

/// `PING` the server and require a `PONG`
pub async fn check_health(conn: &mut ConnectionManager) -> DatabaseResult<()> {
    let response: String = redis::cmd("PING")
        .query_async(conn)
        .await
        .map_err(|e| DatabaseError::HealthCheckFailed(format!("PING failed: {}", e)))?;

    if response != "PONG" {
        return Err(DatabaseError::HealthCheckFailed(format!(
            "PING returned '{}'",
            response
        )));
    }
    Ok(())
}

/// [`check_health`] bounded by `timeout`.
///
/// A `ConnectionManager` retries a dropped connection internally, so an
/// unreachable server would otherwise stall the probe.
pub async fn check_health_within(
    conn: &mut ConnectionManager,
    timeout: Duration,
) -> DatabaseResult<()> {
    tokio::time::timeout(timeout, check_health(conn))
        .await
        .map_err(|_| {
            DatabaseError::HealthCheckFailed(format!("no PING reply within {:?}", timeout))
        })?
}

/// Outcome of a timed health probe
#[derive(Debug, Clone, PartialEq)]
pub struct HealthStatus {
    pub healthy: bool,
    pub message: Option<String>,
    pub response_time_ms: u64,
}

impl HealthStatus {
    pub fn healthy(response_time_ms: u64) -> Self {
        Self {
            healthy: true,
            message: None,
            response_time_ms,
        }
    }

    pub fn unhealthy(message: String, response_time_ms: u64) -> Self {
        Self {
            healthy: false,
            message: Some(message),
            response_time_ms,
        }
    }

    fn from_probe(result: DatabaseResult<()>, elapsed: Duration) -> Self {
        let millis = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        match result {
            Ok(()) => Self::healthy(millis),
            Err(e) => Self::unhealthy(e.to_string(), millis),
        }
    }
}

/// Never fails: reports latency and the failure reason, if any
pub async fn check_health_detailed(conn: &mut ConnectionManager) -> HealthStatus {
    let start = Instant::now();
    let result = check_health_within(conn, DEFAULT_HEALTH_TIMEOUT).await;
    let status = HealthStatus::from_probe(result, start.elapsed());

    debug!(healthy = status.healthy, ms = status.response_time_ms, "Redis health probe");
    status
}
