//! Best-effort contact cache.
//!
//! Nothing in this module returns an error to its caller: backend failures
//! and undecodable payloads become "no value" through [`absorb`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use core_config::{ConfigError, FromEnv, env_or_default, env_parse_or};
use database::redis::{AsyncCommands, ConnectionManager};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{ContactsError, ContactsResult};
use crate::models::{CacheEntry, CanonicalRecord};

/// Longest expiry handed to a backend; longer TTLs are clamped to it
pub const MAX_EXPIRY: Duration = Duration::from_secs(100 * 365 * 86_400);

/// Key-value store with native per-key expiry
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> ContactsResult<Option<String>>;

    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> ContactsResult<()>;

    /// Absent keys are not an error
    async fn delete(&self, key: &str) -> ContactsResult<()>;
}

/// Redis-backed cache storage
#[derive(Clone)]
pub struct RedisCacheBackend {
    redis: ConnectionManager,
}

impl RedisCacheBackend {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl CacheBackend for RedisCacheBackend {
    async fn get(&self, key: &str) -> ContactsResult<Option<String>> {
        let mut conn = self.redis.clone();
        Ok(conn.get(key).await?)
    }

    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> ContactsResult<()> {
        let mut conn = self.redis.clone();
        // SETEX rejects a zero or out-of-range expiry
        let seconds = ttl.as_secs().clamp(1, MAX_EXPIRY.as_secs());
        conn.set_ex::<_, _, ()>(key, value, seconds).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> ContactsResult<()> {
        let mut conn = self.redis.clone();
        conn.del::<_, ()>(key).await?;
        Ok(())
    }
}

/// Process-local cache storage with per-key expiry.
///
/// Used in tests and as the degraded backend when Redis is unreachable.
#[derive(Clone, Default)]
pub struct InMemoryCacheBackend {
    entries: Arc<RwLock<HashMap<String, (String, Instant)>>>,
}

impl InMemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheBackend for InMemoryCacheBackend {
    async fn get(&self, key: &str) -> ContactsResult<Option<String>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some((value, expires_at)) if *expires_at > now => return Ok(Some(value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        self.entries
            .write()
            .await
            .retain(|_, (_, expires_at)| *expires_at > now);
        Ok(None)
    }

    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> ContactsResult<()> {
        let expires_at = Instant::now() + ttl.min(MAX_EXPIRY);
        self.entries
            .write()
            .await
            .insert(key.to_string(), (value, expires_at));
        Ok(())
    }

    async fn delete(&self, key: &str) -> ContactsResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// Cache lifetimes and key layout
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Age below which an entry is served as fresh
    pub ttl: Duration,
    /// Extra time an entry is kept for stale-if-error fallback; zero disables it
    pub stale_grace: Duration,
    pub key_prefix: String,
}

impl CacheConfig {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            ..Self::default()
        }
    }

    pub fn with_stale_grace(mut self, stale_grace: Duration) -> Self {
        self.stale_grace = stale_grace;
        self
    }

    pub fn with_key_prefix(mut self, key_prefix: impl Into<String>) -> Self {
        self.key_prefix = key_prefix.into();
        self
    }

    /// How long the backend keeps an entry at all
    pub fn retention(&self) -> Duration {
        self.ttl.saturating_add(self.stale_grace)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
            stale_grace: Duration::from_secs(86_400),
            key_prefix: "contacts".to_string(),
        }
    }
}

/// Environment variables:
/// - `CONTACTS_CACHE_TTL_SECS` (default: 3600, at least 1)
/// - `CONTACTS_CACHE_STALE_GRACE_SECS` (default: 86400)
/// - `CONTACTS_CACHE_KEY_PREFIX` (default: `contacts`)
impl FromEnv for CacheConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let ttl_secs: u64 = env_parse_or("CONTACTS_CACHE_TTL_SECS", 3600)?;
        if ttl_secs == 0 {
            return Err(ConfigError::ParseError {
                key: "CONTACTS_CACHE_TTL_SECS".to_string(),
                details: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            ttl: Duration::from_secs(ttl_secs),
            stale_grace: Duration::from_secs(env_parse_or(
                "CONTACTS_CACHE_STALE_GRACE_SECS",
                86_400,
            )?),
            key_prefix: env_or_default("CONTACTS_CACHE_KEY_PREFIX", "contacts"),
        })
    }
}

/// Turn a cache backend failure into "no value", logging it
pub fn absorb<T>(operation: &str, key: &str, result: ContactsResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(operation, key = %key, error = %e, "Cache backend failure absorbed");
            None
        }
    }
}

/// Per-owner cache of normalized contact records
#[derive(Clone)]
pub struct ContactCache {
    backend: Arc<dyn CacheBackend>,
    config: CacheConfig,
}

impl ContactCache {
    pub fn new(backend: Arc<dyn CacheBackend>, config: CacheConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn key(&self, owner: &str) -> String {
        format!("{}:{}", self.config.key_prefix, owner)
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        let ttl = TimeDelta::from_std(self.config.ttl).unwrap_or(TimeDelta::MAX);
        Utc::now() - entry.cached_at < ttl
    }

    /// Whatever the backend still holds for `owner`, fresh or not
    async fn read(&self, owner: &str) -> Option<CacheEntry> {
        let key = self.key(owner);
        let raw = absorb("get", &key, self.backend.get(&key).await).flatten()?;

        let decoded = serde_json::from_str::<CacheEntry>(&raw).map_err(ContactsError::from);
        absorb("decode", &key, decoded)
    }

    /// The fresh entry for `owner`, if any
    pub async fn get_entry(&self, owner: &str) -> Option<CacheEntry> {
        let entry = self.read(owner).await?;
        if self.is_fresh(&entry) {
            debug!(owner = %owner, count = entry.count, "Contact cache hit");
            Some(entry)
        } else {
            debug!(owner = %owner, cached_at = %entry.cached_at, "Contact cache entry expired");
            None
        }
    }

    /// Fresh records for `owner`; empty on miss, expiry or backend failure
    pub async fn get(&self, owner: &str) -> Vec<CanonicalRecord> {
        self.get_entry(owner)
            .await
            .map(|entry| entry.records)
            .unwrap_or_default()
    }

    /// Any entry still retained for `owner`, including ones past the TTL.
    ///
    /// With a zero stale grace this sees exactly what [`get_entry`](Self::get_entry) sees.
    pub async fn get_stale(&self, owner: &str) -> Option<CacheEntry> {
        if self.config.stale_grace.is_zero() {
            return self.get_entry(owner).await;
        }
        self.read(owner).await
    }

    /// Overwrite the entry for `owner`, stamped now. Write failures are dropped.
    pub async fn put(&self, owner: &str, records: &[CanonicalRecord]) {
        let key = self.key(owner);
        let entry = CacheEntry::new(records.to_vec());

        let encoded = serde_json::to_string(&entry).map_err(ContactsError::from);
        let Some(payload) = absorb("encode", &key, encoded) else {
            return;
        };

        let written = self
            .backend
            .set_ex(&key, payload, self.config.retention())
            .await;
        if absorb("set", &key, written).is_some() {
            debug!(owner = %owner, count = entry.count, "Cached contacts");
        }
    }

    pub async fn clear(&self, owner: &str) {
        let key = self.key(owner);
        absorb("delete", &key, self.backend.delete(&key).await);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use mockall::predicate;

    fn record(id: &str, name: &str) -> CanonicalRecord {
        CanonicalRecord {
            id: id.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn stored_entry(records: Vec<CanonicalRecord>, cached_at: DateTime<Utc>) -> String {
        serde_json::to_string(&CacheEntry {
            count: records.len(),
            records,
            cached_at,
        })
        .unwrap()
    }

    fn memory_cache(config: CacheConfig) -> (ContactCache, InMemoryCacheBackend) {
        let backend = InMemoryCacheBackend::new();
        (ContactCache::new(Arc::new(backend.clone()), config), backend)
    }

    #[test]
    fn test_key_layout() {
        let (cache, _) = memory_cache(CacheConfig::default().with_key_prefix("people"));
        assert_eq!(cache.key("user_123"), "people:user_123");
    }

    #[test]
    fn test_absorb() {
        assert_eq!(absorb("get", "k", Ok(3)), Some(3));
        let failed: ContactsResult<u8> = Err(ContactsError::Cache("down".to_string()));
        assert_eq!(absorb("get", "k", failed), None);
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let (cache, _) = memory_cache(CacheConfig::default());
        let records = vec![record("people/c1", "Ada"), record("people/c2", "Grace")];

        cache.put("owner", &records).await;

        assert_eq!(cache.get("owner").await, records);
        let entry = cache.get_entry("owner").await.unwrap();
        assert_eq!(entry.count, 2);
    }

    #[tokio::test]
    async fn test_empty_result_is_still_an_entry() {
        let (cache, _) = memory_cache(CacheConfig::default());
        cache.put("owner", &[]).await;

        let entry = cache.get_entry("owner").await.unwrap();
        assert_eq!(entry.count, 0);
        assert!(cache.get("owner").await.is_empty());
    }

    #[tokio::test]
    async fn test_clear_removes_entry_and_tolerates_absence() {
        let (cache, _) = memory_cache(CacheConfig::default());
        cache.put("owner", &[record("1", "Ada")]).await;

        cache.clear("owner").await;
        cache.clear("owner").await;

        assert!(cache.get_entry("owner").await.is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_is_stale_only() {
        let (cache, backend) = memory_cache(CacheConfig::new(Duration::from_secs(60)));
        let old = Utc::now() - TimeDelta::seconds(120);
        backend
            .set_ex(
                &cache.key("owner"),
                stored_entry(vec![record("1", "Ada")], old),
                Duration::from_secs(600),
            )
            .await
            .unwrap();

        assert!(cache.get_entry("owner").await.is_none());
        assert!(cache.get("owner").await.is_empty());

        let stale = cache.get_stale("owner").await.unwrap();
        assert_eq!(stale.records[0].name, "Ada");
        assert_eq!(stale.cached_at, old);
    }

    #[tokio::test]
    async fn test_zero_grace_disables_stale_reads() {
        let config = CacheConfig::new(Duration::from_secs(60)).with_stale_grace(Duration::ZERO);
        let (cache, backend) = memory_cache(config);
        backend
            .set_ex(
                &cache.key("owner"),
                stored_entry(vec![record("1", "Ada")], Utc::now() - TimeDelta::seconds(120)),
                Duration::from_secs(600),
            )
            .await
            .unwrap();

        assert!(cache.get_stale("owner").await.is_none());
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_a_miss() {
        let (cache, backend) = memory_cache(CacheConfig::default());
        backend
            .set_ex(&cache.key("owner"), "{not json".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        assert!(cache.get_entry("owner").await.is_none());
        assert!(cache.get_stale("owner").await.is_none());
    }

    #[tokio::test]
    async fn test_backend_failures_are_absorbed() {
        let mut backend = MockCacheBackend::new();
        backend
            .expect_get()
            .returning(|_| Err(ContactsError::Cache("connection refused".to_string())));
        backend
            .expect_set_ex()
            .times(1)
            .returning(|_, _, _| Err(ContactsError::Cache("connection refused".to_string())));
        backend
            .expect_delete()
            .times(1)
            .returning(|_| Err(ContactsError::Cache("connection refused".to_string())));

        let cache = ContactCache::new(Arc::new(backend), CacheConfig::default());

        assert!(cache.get("owner").await.is_empty());
        assert!(cache.get_stale("owner").await.is_none());
        cache.put("owner", &[record("1", "Ada")]).await;
        cache.clear("owner").await;
    }

    #[tokio::test]
    async fn test_put_keeps_entry_for_ttl_plus_grace() {
        let mut backend = MockCacheBackend::new();
        backend
            .expect_set_ex()
            .with(
                predicate::eq("contacts:owner"),
                predicate::always(),
                predicate::eq(Duration::from_secs(3600 + 86_400)),
            )
            .times(1)
            .returning(|_, _, _| Ok(()));

        let cache = ContactCache::new(Arc::new(backend), CacheConfig::default());
        cache.put("owner", &[]).await;
    }

    #[test]
    fn test_retention_saturates() {
        let config = CacheConfig::default().with_stale_grace(Duration::MAX);
        assert_eq!(config.retention(), Duration::MAX);
    }

    #[tokio::test]
    async fn test_huge_stale_grace_still_caches() {
        let config = CacheConfig::default().with_stale_grace(Duration::from_secs(u64::MAX));
        let (cache, _backend) = memory_cache(config);

        cache.put("owner", &[record("1", "Ada")]).await;

        assert_eq!(cache.get("owner").await.len(), 1);
        assert_eq!(cache.get_stale("owner").await.map(|e| e.count), Some(1));
    }

    #[tokio::test]
    async fn test_in_memory_backend_clamps_unbounded_ttl() {
        let backend = InMemoryCacheBackend::new();
        backend
            .set_ex("k", "v".to_string(), Duration::MAX)
            .await
            .unwrap();
        assert_eq!(backend.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_memory_backend_expires_keys() {
        let backend = InMemoryCacheBackend::new();
        backend
            .set_ex("k", "v".to_string(), Duration::from_secs(10))
            .await
            .unwrap();

        assert_eq!(backend.get("k").await.unwrap().as_deref(), Some("v"));

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(backend.get("k").await.unwrap().is_none());
    }

    #[test]
    fn test_config_from_env_defaults() {
        temp_env::with_vars(
            [
                ("CONTACTS_CACHE_TTL_SECS", None::<&str>),
                ("CONTACTS_CACHE_STALE_GRACE_SECS", None),
                ("CONTACTS_CACHE_KEY_PREFIX", None),
            ],
            || {
                let config = CacheConfig::from_env().unwrap();
                assert_eq!(config.ttl, Duration::from_secs(3600));
                assert_eq!(config.stale_grace, Duration::from_secs(86_400));
                assert_eq!(config.key_prefix, "contacts");
            },
        );
    }

    #[test]
    fn test_config_rejects_zero_ttl() {
        temp_env::with_var("CONTACTS_CACHE_TTL_SECS", Some("0"), || {
            assert!(matches!(
                CacheConfig::from_env(),
                Err(ConfigError::ParseError { .. })
            ));
        });
    }
}
