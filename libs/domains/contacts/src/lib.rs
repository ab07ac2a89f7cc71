//! Contacts Domain
//!
//! Synchronizes a user's Google contacts into a stable record shape, caches
//! them per owner and feeds them to the vector index.
//!
//! # Features
//!
//! - Record normalization with field fallbacks and generated avatars
//! - Cache-first reads with stale-if-error fallback
//! - Redis or in-process cache storage
//! - Google People API client with pagination
//! - JWT caller verification and Clerk-linked access tokens
//! - Contact indexing for similarity search
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │ AuthenticatedContacts│  ← bearer token → owner + upstream token
//! └──────────┬───────────┘
//!            │
//! ┌──────────▼───────────┐     ┌───────────────────┐
//! │  ContactSyncService  │────▶│   UpstreamFetch   │
//! └──────────┬───────────┘     └───────────────────┘
//!            │
//! ┌──────────▼───────────┐
//! │     ContactCache     │  ← freshness, stale window, absorb
//! └──────────┬───────────┘
//!            │
//! ┌──────────▼───────────┐
//! │     CacheBackend     │  ← Redis / in-memory
//! └──────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use domain_contacts::{
//!     CacheConfig, ContactCache, ContactSyncService, GoogleContactsClient,
//!     GoogleContactsConfig, InMemoryCacheBackend,
//! };
//!
//! # async fn example() -> domain_contacts::ContactsResult<()> {
//! let cache = ContactCache::new(Arc::new(InMemoryCacheBackend::new()), CacheConfig::default());
//! let service = ContactSyncService::new(cache);
//! let google = GoogleContactsClient::new(GoogleContactsConfig::default())?;
//!
//! let records = service
//!     .get_records("user_123", &google.for_token("ya29.access-token"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod error;
pub mod identity;
pub mod indexing;
pub mod models;
pub mod normalizer;
pub mod service;
pub mod upstream;

pub use cache::{
    CacheBackend, CacheConfig, ContactCache, InMemoryCacheBackend, RedisCacheBackend, absorb,
};
pub use error::{ContactsError, ContactsResult};
pub use identity::{
    AuthenticatedContacts, ClerkConfig, ClerkTokenSource, Identity, IdentityVerifier,
    JwtIdentityVerifier, JwtVerifierConfig, UpstreamTokenSource,
};
pub use indexing::{ContactIndexer, ContactTextExtractor, owner_namespace};
pub use models::{CacheEntry, CanonicalRecord, UNKNOWN_CONTACT};
pub use normalizer::normalize;
pub use service::{ContactSyncService, RecordSource, SyncOutcome};
pub use upstream::{
    GoogleConnectionsFetch, GoogleContactsClient, GoogleContactsConfig, UpstreamFetch,
};
