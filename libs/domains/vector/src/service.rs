use std::sync::Arc;

use tracing::{debug, info};

use crate::config::RetrievalConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{VectorError, VectorResult};
use crate::models::{Metadata, QueryResult, VectorDocument, VectorRecord};
use crate::repository::VectorStore;

/// Embeds text and runs it against a [`VectorStore`].
///
/// Store and embedding failures propagate unchanged; nothing here retries.
pub struct RetrievalService<S: VectorStore> {
    store: S,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    config: RetrievalConfig,
}

impl<S: VectorStore> RetrievalService<S> {
    pub fn new(store: S, config: RetrievalConfig) -> Self {
        Self {
            store,
            embedding_provider: None,
            config,
        }
    }

    pub fn with_embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    fn provider(&self) -> VectorResult<&Arc<dyn EmbeddingProvider>> {
        self.embedding_provider
            .as_ref()
            .ok_or_else(|| VectorError::Config("No embedding provider configured".to_string()))
    }

    /// Embed `query` and return the `top_k` most similar records in `namespace`
    pub async fn similarity_search(
        &self,
        query: &str,
        top_k: usize,
        namespace: &str,
    ) -> VectorResult<Vec<QueryResult>> {
        if query.trim().is_empty() {
            return Err(VectorError::Validation("Query text must not be empty".to_string()));
        }

        let provider = self.provider()?;
        let mut vectors = provider.embed(&[query.to_string()]).await?;
        if vectors.len() != 1 {
            return Err(VectorError::Embedding(format!(
                "Expected 1 query embedding, got {}",
                vectors.len()
            )));
        }
        let vector = vectors.remove(0);

        let results = self.store.query(vector, top_k, namespace).await?;
        debug!(namespace = %namespace, top_k, hits = results.len(), "Similarity search");
        Ok(results)
    }

    /// Embed documents in batches of `batch_size` and upsert them.
    ///
    /// Batches already written stay written if a later batch fails.
    pub async fn index_documents(
        &self,
        documents: Vec<VectorDocument>,
        namespace: &str,
    ) -> VectorResult<usize> {
        if documents.is_empty() {
            return Ok(0);
        }

        let provider = self.provider()?;
        let batch_size = self.config.batch_size.max(1);
        let mut indexed = 0;

        for batch in documents.chunks(batch_size) {
            let texts: Vec<String> = batch.iter().map(|d| d.text.clone()).collect();
            let vectors = provider.embed(&texts).await?;

            if vectors.len() != batch.len() {
                return Err(VectorError::Embedding(format!(
                    "Expected {} embeddings, got {}",
                    batch.len(),
                    vectors.len()
                )));
            }

            let records: Vec<VectorRecord> = batch
                .iter()
                .zip(vectors)
                .map(|(doc, values)| {
                    VectorRecord::new(doc.id.clone(), values).with_metadata(doc.metadata.clone())
                })
                .collect();

            indexed += self.store.upsert(records, namespace).await?;
        }

        info!(namespace = %namespace, count = indexed, "Indexed documents");
        Ok(indexed)
    }

    /// Upsert pre-computed vectors given as parallel lists
    pub async fn upsert(
        &self,
        vectors: Vec<Vec<f32>>,
        ids: Vec<String>,
        metadata: Vec<Metadata>,
        namespace: &str,
    ) -> VectorResult<usize> {
        let records = VectorRecord::zip(vectors, ids, metadata)?;
        self.store.upsert(records, namespace).await
    }

    pub async fn query(
        &self,
        vector: Vec<f32>,
        top_k: usize,
        namespace: &str,
    ) -> VectorResult<Vec<QueryResult>> {
        self.store.query(vector, top_k, namespace).await
    }

    /// Best-effort sample; see [`VectorStore::fetch_all`]
    pub async fn fetch_all(&self, namespace: &str, limit: usize) -> VectorResult<Vec<QueryResult>> {
        self.store.fetch_all(namespace, limit).await
    }

    pub async fn delete(&self, ids: Vec<String>, namespace: &str) -> VectorResult<usize> {
        self.store.delete(ids, namespace).await
    }

    pub async fn count(&self, namespace: &str) -> VectorResult<usize> {
        self.store.count(namespace).await
    }
}
