//! Shared test utilities for the contacts workspace
//!
//! - `TestRedis`: Redis container with automatic cleanup (feature: "redis")
//! - `TestDataBuilder`: deterministic owners and raw Google People payloads
//! - `assertions`: custom assertion helpers
//!
//! # Features
//!
//! - `redis` (default): enables Redis test infrastructure
//!
//! # Usage
//!
//! ```rust,ignore
//! use test_utils::{TestDataBuilder, TestRedis};
//!
//! #[tokio::test]
//! #[ignore] // Requires Docker
//! async fn my_redis_test() {
//!     let redis = TestRedis::new().await;
//!     let builder = TestDataBuilder::from_test_name("my_redis_test");
//!
//!     let owner = builder.owner_id();
//!     let payload = builder.people(3);
//! }
//! ```

use serde_json::{Value, json};
use uuid::Uuid;

#[cfg(feature = "redis")]
mod redis;

#[cfg(feature = "redis")]
pub use redis::TestRedis;

const FIRST_NAMES: [&str; 6] = ["Ada", "Grace", "Alan", "Edsger", "Barbara", "Donald"];
const LAST_NAMES: [&str; 6] = ["Lovelace", "Hopper", "Turing", "Dijkstra", "Liskov", "Knuth"];

/// Builder for test data with deterministic randomization
///
/// The same seed always yields the same owners and payloads.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Create from test name (generates seed from test name hash)
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("test_cache_hit");
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// Owner identity in the shape of an auth provider subject
    pub fn owner_id(&self) -> String {
        let bytes = self.seed.to_le_bytes();
        let mut uuid_bytes = [0u8; 16];
        uuid_bytes[..8].copy_from_slice(&bytes);
        uuid_bytes[8..16].copy_from_slice(&bytes);
        format!("user_{}", Uuid::from_bytes(uuid_bytes).simple())
    }

    /// A namespace or key prefix unique to this builder
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::new(7);
    /// assert_eq!(builder.name("contacts", "main"), "test-contacts-7-main");
    /// ```
    pub fn name(&self, prefix: &str, suffix: &str) -> String {
        format!("test-{}-{}-{}", prefix, self.seed, suffix)
    }

    /// Raw Google People `Person` entry with a name, email and phone
    pub fn person(&self, index: usize) -> Value {
        let offset = (self.seed as usize).wrapping_add(index);
        let first = FIRST_NAMES[offset % FIRST_NAMES.len()];
        let last = LAST_NAMES[(offset / FIRST_NAMES.len()) % LAST_NAMES.len()];

        json!({
            "resourceName": format!("people/c{}{}", self.seed % 10_000, index),
            "names": [{"displayName": format!("{} {}", first, last)}],
            "emailAddresses": [{"value": format!("{}.{}@example.com", first, last).to_lowercase()}],
            "phoneNumbers": [{"value": format!("+1 555 {:04}", index)}]
        })
    }

    /// `count` distinct person entries
    pub fn people(&self, count: usize) -> Vec<Value> {
        (0..count).map(|i| self.person(i)).collect()
    }
}

/// Test assertion helpers
pub mod assertions {
    /// Assert that an optional value is Some
    pub fn assert_some<T>(value: Option<T>, context: &str) -> T {
        value.unwrap_or_else(|| panic!("{}: expected Some, got None", context))
    }

    /// Assert that two id lists match, ignoring order
    pub fn assert_same_ids(actual: &[String], expected: &[&str], context: &str) {
        let mut actual: Vec<&str> = actual.iter().map(String::as_str).collect();
        let mut expected = expected.to_vec();
        actual.sort_unstable();
        expected.sort_unstable();
        assert_eq!(actual, expected, "{}: id sets differ", context);
    }
}
