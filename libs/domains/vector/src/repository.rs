use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{VectorError, VectorResult};
use crate::models::{QueryResult, VectorRecord};

/// Namespaced vector storage with cosine similarity queries.
///
/// Every operation is scoped to a namespace; namespaces never see each
/// other's records. Backend failures surface as [`VectorError::Store`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Dimension every stored and queried vector must have
    fn dimension(&self) -> usize;

    /// Insert or replace records by id. Returns the number written.
    async fn upsert(&self, records: Vec<VectorRecord>, namespace: &str) -> VectorResult<usize>;

    /// At most `top_k` results ordered by descending score
    async fn query(
        &self,
        vector: Vec<f32>,
        top_k: usize,
        namespace: &str,
    ) -> VectorResult<Vec<QueryResult>>;

    /// Best-effort sample of up to `limit` records.
    ///
    /// Implemented as a query against the zero vector, so it is neither
    /// guaranteed complete nor meaningfully ordered. An empty namespace
    /// yields an empty result.
    async fn fetch_all(&self, namespace: &str, limit: usize) -> VectorResult<Vec<QueryResult>> {
        self.query(vec![0.0; self.dimension()], limit, namespace).await
    }

    /// Remove records by id; unknown ids are ignored. Returns the number requested.
    async fn delete(&self, ids: Vec<String>, namespace: &str) -> VectorResult<usize>;

    async fn count(&self, namespace: &str) -> VectorResult<usize>;
}

/// Reject vectors whose length differs from the store dimension
pub(crate) fn check_dimension(values: &[f32], dimension: usize, id: &str) -> VectorResult<()> {
    if values.len() != dimension {
        return Err(VectorError::Validation(format!(
            "Vector '{}' has dimension {}, expected {}",
            id,
            values.len(),
            dimension
        )));
    }
    Ok(())
}

/// Cosine similarity; 0.0 when either vector has zero magnitude
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}

/// In-process store for tests and local development
#[derive(Clone)]
pub struct InMemoryVectorStore {
    dimension: usize,
    namespaces: Arc<RwLock<HashMap<String, BTreeMap<String, VectorRecord>>>>,
}

impl InMemoryVectorStore {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            namespaces: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn upsert(&self, records: Vec<VectorRecord>, namespace: &str) -> VectorResult<usize> {
        for record in &records {
            check_dimension(&record.values, self.dimension, &record.id)?;
        }

        let count = records.len();
        let mut namespaces = self.namespaces.write().await;
        let entries = namespaces.entry(namespace.to_string()).or_default();
        for record in records {
            entries.insert(record.id.clone(), record);
        }

        Ok(count)
    }

    async fn query(
        &self,
        vector: Vec<f32>,
        top_k: usize,
        namespace: &str,
    ) -> VectorResult<Vec<QueryResult>> {
        check_dimension(&vector, self.dimension, "query")?;

        let namespaces = self.namespaces.read().await;
        let Some(entries) = namespaces.get(namespace) else {
            return Ok(vec![]);
        };

        let mut scored: Vec<QueryResult> = entries
            .values()
            .map(|record| {
                QueryResult::new(
                    record.id.clone(),
                    Some(cosine_similarity(&vector, &record.values)),
                    record.metadata.clone(),
                )
            })
            .collect();

        // Stable sort keeps id order among equal scores
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);

        Ok(scored)
    }

    async fn delete(&self, ids: Vec<String>, namespace: &str) -> VectorResult<usize> {
        let mut namespaces = self.namespaces.write().await;
        if let Some(entries) = namespaces.get_mut(namespace) {
            for id in &ids {
                entries.remove(id);
            }
        }
        Ok(ids.len())
    }

    async fn count(&self, namespace: &str) -> VectorResult<usize> {
        let namespaces = self.namespaces.read().await;
        Ok(namespaces.get(namespace).map_or(0, |entries| entries.len()))
    }
}
