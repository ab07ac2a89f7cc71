use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name given to records whose provider entry carries no display name
pub const UNKNOWN_CONTACT: &str = "Unknown Contact";

/// A contact reduced to one primary value per field.
///
/// Missing fields are empty strings rather than `None` so the cached
/// shape stays flat and stable.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub organization: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub note: String,
    /// Provider photo URL or a generated placeholder keyed by name
    #[serde(default)]
    pub avatar: String,
}

impl CanonicalRecord {
    /// Worth keeping: a real name, an email or a phone number
    pub fn is_meaningful(&self) -> bool {
        self.name != UNKNOWN_CONTACT || !self.email.is_empty() || !self.phone.is_empty()
    }
}

/// Cached contact collection for one owner.
///
/// Persisted as `{"records": [...], "cachedAt": "<RFC 3339>", "count": n}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub records: Vec<CanonicalRecord>,
    pub cached_at: DateTime<Utc>,
    pub count: usize,
}

impl CacheEntry {
    pub fn new(records: Vec<CanonicalRecord>) -> Self {
        Self {
            count: records.len(),
            records,
            cached_at: Utc::now(),
        }
    }
}
