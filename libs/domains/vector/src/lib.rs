//! Vector retrieval domain
//!
//! Embeds free text and answers nearest-neighbour queries over a namespaced
//! vector index.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │ RetrievalService │  ← similarity search, batch indexing
//! └────────┬─────────┘
//!          │
//! ┌────────▼────────┐       ┌───────────────────┐
//! │   VectorStore   │       │ EmbeddingProvider │
//! │     (trait)     │       │      (trait)      │
//! └────────┬────────┘       └─────────┬─────────┘
//!          │                          │
//! ┌────────▼────────────┐   ┌─────────▼─────────┐
//! │ QdrantVectorStore   │   │  OpenAIProvider   │
//! │ InMemoryVectorStore │   └───────────────────┘
//! └─────────────────────┘
//! ```
//!
//! Text composition lives with the domain that owns the records: implement
//! [`TextExtractor`] and hand the resulting [`VectorDocument`]s to
//! [`RetrievalService::index_documents`].
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use core_config::FromEnv;
//! use domain_vector::{
//!     OpenAIProvider, QdrantConfig, QdrantVectorStore, RetrievalConfig, RetrievalService,
//!     VectorDocument, EmbeddingProvider,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = Arc::new(OpenAIProvider::from_env()?);
//! let store = QdrantVectorStore::new(
//!     QdrantConfig::from_env()?,
//!     provider.model().dimension() as usize,
//! )?;
//! let service = RetrievalService::new(store, RetrievalConfig::from_env()?)
//!     .with_embedding_provider(provider);
//!
//! service
//!     .index_documents(vec![VectorDocument::new("1", "Ada Lovelace, analyst")], "contacts")
//!     .await?;
//! let hits = service.similarity_search("mathematician", 5, "contacts").await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod embedding;
pub mod error;
pub mod extractor;
pub mod models;
pub mod qdrant;
pub mod repository;
pub mod service;

pub use config::RetrievalConfig;
pub use embedding::{EmbeddingProvider, OpenAIConfig, OpenAIProvider};
pub use error::{ErrorClass, VectorError, VectorResult};
pub use extractor::TextExtractor;
pub use models::{
    EmbeddingModel, Metadata, MetadataValue, QueryResult, ShortenableModel, VectorDocument,
    VectorRecord,
};
pub use qdrant::{QdrantConfig, QdrantVectorStore};
pub use repository::{InMemoryVectorStore, VectorStore, cosine_similarity};
pub use service::RetrievalService;
