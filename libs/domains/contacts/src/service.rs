use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::cache::ContactCache;
use crate::error::{ContactsError, ContactsResult};
use crate::models::{CacheEntry, CanonicalRecord};
use crate::normalizer::normalize;
use crate::upstream::UpstreamFetch;

/// Where a set of records was served from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSource {
    /// Fresh cache entry; upstream was not called
    Cache,
    /// Fetched and normalized just now
    Upstream,
    /// Upstream failed; served a retained entry instead
    StaleFallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncOutcome {
    pub records: Vec<CanonicalRecord>,
    pub source: RecordSource,
    /// When the served entry was cached; `None` for upstream results
    pub cached_at: Option<DateTime<Utc>>,
}

impl SyncOutcome {
    fn from_entry(entry: CacheEntry, source: RecordSource) -> Self {
        Self {
            records: entry.records,
            source,
            cached_at: Some(entry.cached_at),
        }
    }
}

/// Cache-first contact sync with stale-if-error fallback.
///
/// Concurrent misses for the same owner may each call upstream; the
/// resulting cache writes are idempotent overwrites.
#[derive(Clone)]
pub struct ContactSyncService {
    cache: ContactCache,
}

impl ContactSyncService {
    pub fn new(cache: ContactCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &ContactCache {
        &self.cache
    }

    pub async fn get_records(
        &self,
        owner: &str,
        upstream: &dyn UpstreamFetch,
    ) -> ContactsResult<Vec<CanonicalRecord>> {
        Ok(self.get_records_with_source(owner, upstream).await?.records)
    }

    /// Serve a fresh cache entry, otherwise sync from upstream
    pub async fn get_records_with_source(
        &self,
        owner: &str,
        upstream: &dyn UpstreamFetch,
    ) -> ContactsResult<SyncOutcome> {
        validate_owner(owner)?;

        if let Some(entry) = self.cache.get_entry(owner).await {
            info!(owner = %owner, count = entry.count, "Returning cached contacts");
            return Ok(SyncOutcome::from_entry(entry, RecordSource::Cache));
        }

        self.sync(owner, upstream).await
    }

    /// Skip the initial cache read; failure handling is unchanged
    pub async fn refresh(
        &self,
        owner: &str,
        upstream: &dyn UpstreamFetch,
    ) -> ContactsResult<SyncOutcome> {
        validate_owner(owner)?;
        self.sync(owner, upstream).await
    }

    /// Cache-only read; never calls upstream
    pub async fn cached_records(&self, owner: &str) -> ContactsResult<Option<CacheEntry>> {
        validate_owner(owner)?;
        Ok(self.cache.get_entry(owner).await)
    }

    pub async fn clear_cache(&self, owner: &str) -> ContactsResult<()> {
        validate_owner(owner)?;
        self.cache.clear(owner).await;
        info!(owner = %owner, "Cleared contact cache");
        Ok(())
    }

    async fn sync(&self, owner: &str, upstream: &dyn UpstreamFetch) -> ContactsResult<SyncOutcome> {
        match upstream.fetch().await {
            Ok(raw) => {
                let records = normalize(&raw);
                self.cache.put(owner, &records).await;
                info!(
                    owner = %owner,
                    fetched = raw.len(),
                    count = records.len(),
                    "Fetched contacts from upstream"
                );
                Ok(SyncOutcome {
                    records,
                    source: RecordSource::Upstream,
                    cached_at: None,
                })
            }
            Err(err) => {
                error!(owner = %owner, error = %err, "Upstream contacts fetch failed");
                self.fall_back(owner, err).await
            }
        }
    }

    async fn fall_back(&self, owner: &str, err: ContactsError) -> ContactsResult<SyncOutcome> {
        match self.cache.get_stale(owner).await {
            Some(entry) => {
                warn!(
                    owner = %owner,
                    count = entry.count,
                    cached_at = %entry.cached_at,
                    "Serving cached contacts after upstream failure"
                );
                Ok(SyncOutcome::from_entry(entry, RecordSource::StaleFallback))
            }
            // Credential problems stay distinguishable from outages
            None if matches!(err, ContactsError::Auth(_)) => Err(err),
            None => Err(ContactsError::UpstreamUnavailable {
                owner: owner.to_string(),
                status: err.upstream_status(),
                reason: err.to_string(),
            }),
        }
    }
}

fn validate_owner(owner: &str) -> ContactsResult<()> {
    if owner.trim().is_empty() {
        return Err(ContactsError::Validation("Owner must not be empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheBackend, CacheConfig, InMemoryCacheBackend, MockCacheBackend};
    use crate::upstream::MockUpstreamFetch;
    use chrono::TimeDelta;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn ada_payload() -> Vec<serde_json::Value> {
        vec![json!({
            "resourceName": "people/c1",
            "names": [{"displayName": "Ada Lovelace"}],
            "emailAddresses": [{"value": "ada@x.com"}]
        })]
    }

    fn service_with(config: CacheConfig) -> (ContactSyncService, InMemoryCacheBackend) {
        let backend = InMemoryCacheBackend::new();
        let cache = ContactCache::new(Arc::new(backend.clone()), config);
        (ContactSyncService::new(cache), backend)
    }

    fn upstream_ok() -> MockUpstreamFetch {
        let mut upstream = MockUpstreamFetch::new();
        upstream.expect_fetch().returning(|| Ok(ada_payload()));
        upstream
    }

    fn upstream_failing(status: u16) -> MockUpstreamFetch {
        let mut upstream = MockUpstreamFetch::new();
        upstream.expect_fetch().returning(move || {
            Err(ContactsError::Upstream {
                status: Some(status),
                message: "access token expired or invalid".to_string(),
            })
        });
        upstream
    }

    async fn seed_stale(service: &ContactSyncService, backend: &InMemoryCacheBackend, owner: &str) {
        let entry = CacheEntry {
            records: normalize(&ada_payload()),
            cached_at: Utc::now() - TimeDelta::hours(3),
            count: 1,
        };
        backend
            .set_ex(
                &service.cache().key(owner),
                serde_json::to_string(&entry).unwrap(),
                Duration::from_secs(3600),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_cache_hit_never_calls_upstream() {
        let (service, _) = service_with(CacheConfig::default());
        service.get_records("owner", &upstream_ok()).await.unwrap();

        let mut upstream = MockUpstreamFetch::new();
        upstream.expect_fetch().times(0);

        let outcome = service
            .get_records_with_source("owner", &upstream)
            .await
            .unwrap();
        assert_eq!(outcome.source, RecordSource::Cache);
        assert_eq!(outcome.records[0].name, "Ada Lovelace");
        assert!(outcome.cached_at.is_some());
    }

    #[tokio::test]
    async fn test_miss_fetches_normalizes_and_caches() {
        let (service, _) = service_with(CacheConfig::default());
        let mut upstream = MockUpstreamFetch::new();
        upstream
            .expect_fetch()
            .times(1)
            .returning(|| Ok(ada_payload()));

        let first = service.get_records_with_source("owner", &upstream).await.unwrap();
        let second = service.get_records_with_source("owner", &upstream).await.unwrap();

        assert_eq!(first.source, RecordSource::Upstream);
        assert_eq!(second.source, RecordSource::Cache);
        assert_eq!(first.records, second.records);
        assert_eq!(first.records[0].email, "ada@x.com");
    }

    #[tokio::test]
    async fn test_empty_upstream_result_is_cached() {
        let (service, _) = service_with(CacheConfig::default());
        let mut upstream = MockUpstreamFetch::new();
        upstream.expect_fetch().times(1).returning(|| Ok(vec![]));

        assert!(service.get_records("owner", &upstream).await.unwrap().is_empty());
        assert!(service.get_records("owner", &upstream).await.unwrap().is_empty());
        assert_eq!(service.cached_records("owner").await.unwrap().unwrap().count, 0);
    }

    #[tokio::test]
    async fn test_upstream_failure_serves_stale_entry() {
        let (service, backend) = service_with(CacheConfig::new(Duration::from_secs(60)));
        seed_stale(&service, &backend, "owner").await;

        let outcome = service
            .get_records_with_source("owner", &upstream_failing(503))
            .await
            .unwrap();

        assert_eq!(outcome.source, RecordSource::StaleFallback);
        assert_eq!(outcome.records[0].name, "Ada Lovelace");
    }

    #[tokio::test]
    async fn test_upstream_failure_without_cache_is_unavailable() {
        let (service, _) = service_with(CacheConfig::default());

        let err = service
            .get_records("owner", &upstream_failing(401))
            .await
            .unwrap_err();

        match err {
            ContactsError::UpstreamUnavailable { owner, status, .. } => {
                assert_eq!(owner, "owner");
                assert_eq!(status, Some(401));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_auth_failure_without_cache_stays_auth() {
        let (service, _) = service_with(CacheConfig::default());
        let mut upstream = MockUpstreamFetch::new();
        upstream
            .expect_fetch()
            .returning(|| Err(ContactsError::Auth("Google account not connected".to_string())));

        let err = service.get_records("owner", &upstream).await.unwrap_err();
        assert!(matches!(err, ContactsError::Auth(_)));
    }

    #[tokio::test]
    async fn test_auth_failure_serves_stale_entry() {
        let (service, backend) = service_with(CacheConfig::new(Duration::from_secs(60)));
        seed_stale(&service, &backend, "owner").await;
        let mut upstream = MockUpstreamFetch::new();
        upstream
            .expect_fetch()
            .returning(|| Err(ContactsError::Auth("token lookup failed".to_string())));

        let outcome = service
            .get_records_with_source("owner", &upstream)
            .await
            .unwrap();
        assert_eq!(outcome.source, RecordSource::StaleFallback);
    }

    #[tokio::test]
    async fn test_zero_grace_ignores_expired_entry_on_failure() {
        let config = CacheConfig::new(Duration::from_secs(60)).with_stale_grace(Duration::ZERO);
        let (service, backend) = service_with(config);
        seed_stale(&service, &backend, "owner").await;

        let err = service
            .get_records("owner", &upstream_failing(503))
            .await
            .unwrap_err();
        assert!(matches!(err, ContactsError::UpstreamUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_refresh_bypasses_fresh_cache() {
        let (service, _) = service_with(CacheConfig::default());
        let mut upstream = MockUpstreamFetch::new();
        upstream
            .expect_fetch()
            .times(2)
            .returning(|| Ok(ada_payload()));

        service.get_records("owner", &upstream).await.unwrap();
        let outcome = service.refresh("owner", &upstream).await.unwrap();
        assert_eq!(outcome.source, RecordSource::Upstream);
    }

    #[tokio::test]
    async fn test_refresh_failure_falls_back_to_fresh_entry() {
        let (service, _) = service_with(CacheConfig::default());
        service.get_records("owner", &upstream_ok()).await.unwrap();

        let outcome = service.refresh("owner", &upstream_failing(500)).await.unwrap();
        assert_eq!(outcome.source, RecordSource::StaleFallback);
    }

    #[tokio::test]
    async fn test_cache_outage_does_not_fail_the_fetch() {
        let mut backend = MockCacheBackend::new();
        backend
            .expect_get()
            .returning(|_| Err(ContactsError::Cache("connection refused".to_string())));
        backend
            .expect_set_ex()
            .returning(|_, _, _| Err(ContactsError::Cache("connection refused".to_string())));

        let service = ContactSyncService::new(ContactCache::new(
            Arc::new(backend),
            CacheConfig::default(),
        ));

        let records = service.get_records("owner", &upstream_ok()).await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_clear_cache_forces_next_fetch() {
        let (service, _) = service_with(CacheConfig::default());
        let mut upstream = MockUpstreamFetch::new();
        upstream
            .expect_fetch()
            .times(2)
            .returning(|| Ok(ada_payload()));

        service.get_records("owner", &upstream).await.unwrap();
        service.clear_cache("owner").await.unwrap();
        assert!(service.cached_records("owner").await.unwrap().is_none());
        service.get_records("owner", &upstream).await.unwrap();
    }

    #[tokio::test]
    async fn test_blank_owner_is_rejected() {
        let (service, _) = service_with(CacheConfig::default());
        let mut upstream = MockUpstreamFetch::new();
        upstream.expect_fetch().times(0);

        let err = service.get_records("  ", &upstream).await.unwrap_err();
        assert!(matches!(err, ContactsError::Validation(_)));
        assert!(service.clear_cache("").await.is_err());
    }
}
