use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    self, CountPointsBuilder, CreateCollectionBuilder, DeletePointsBuilder, Distance, PointId,
    PointStruct, ScrollPointsBuilder, SearchPointsBuilder, UpsertPointsBuilder,
    Value as QdrantValue, VectorParamsBuilder,
};
use tracing::{debug, info};
use uuid::Uuid;

use super::QdrantConfig;
use crate::error::{VectorError, VectorResult};
use crate::models::{Metadata, MetadataValue, QueryResult, VectorRecord};
use crate::repository::{VectorStore, check_dimension};

/// Payload key holding the caller-supplied record id
const RECORD_ID_KEY: &str = "_record_id";

/// Qdrant-backed [`VectorStore`].
///
/// Each namespace maps to its own cosine collection, created on first upsert.
pub struct QdrantVectorStore {
    client: Qdrant,
    collection_prefix: String,
    dimension: usize,
}

impl QdrantVectorStore {
    pub fn new(config: QdrantConfig, dimension: usize) -> VectorResult<Self> {
        let mut builder = Qdrant::from_url(&config.url);

        if let Some(api_key) = config.api_key {
            builder = builder.api_key(api_key);
        }

        builder = builder.timeout(Duration::from_secs(config.timeout_secs));

        let client = builder
            .build()
            .map_err(|e| VectorError::Config(format!("Failed to build Qdrant client: {}", e)))?;

        Ok(Self::from_client(client, config.collection_prefix, dimension))
    }

    pub fn from_client(client: Qdrant, collection_prefix: String, dimension: usize) -> Self {
        Self {
            client,
            collection_prefix,
            dimension,
        }
    }

    fn collection_name(&self, namespace: &str) -> String {
        collection_name(&self.collection_prefix, namespace)
    }

    async fn ensure_collection(&self, name: &str) -> VectorResult<()> {
        if self.client.collection_exists(name).await? {
            return Ok(());
        }

        let builder = CreateCollectionBuilder::new(name).vectors_config(VectorParamsBuilder::new(
            self.dimension as u64,
            Distance::Cosine,
        ));

        if let Err(e) = self.client.create_collection(builder).await {
            // Another writer may have created it between the check and the create
            if !self.client.collection_exists(name).await? {
                return Err(e.into());
            }
            debug!(collection = %name, "Collection created concurrently");
            return Ok(());
        }

        info!(collection = %name, dimension = self.dimension, "Created Qdrant collection");
        Ok(())
    }
}

fn collection_name(prefix: &str, namespace: &str) -> String {
    format!("{}_{}", prefix, namespace)
}

/// Qdrant only accepts integer or UUID point ids
fn point_id_for(record_id: &str) -> PointId {
    PointId::from(Uuid::new_v5(&Uuid::NAMESPACE_OID, record_id.as_bytes()).to_string())
}

fn point_id_to_string(point_id: &PointId) -> Option<String> {
    match &point_id.point_id_options {
        Some(qdrant::point_id::PointIdOptions::Uuid(uuid)) => Some(uuid.clone()),
        Some(qdrant::point_id::PointIdOptions::Num(num)) => Some(num.to_string()),
        None => None,
    }
}

fn metadata_to_payload(record_id: &str, metadata: Metadata) -> HashMap<String, QdrantValue> {
    let mut payload: HashMap<String, QdrantValue> = metadata
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                MetadataValue::Bool(b) => QdrantValue::from(b),
                MetadataValue::Integer(i) => QdrantValue::from(i),
                MetadataValue::Float(f) => QdrantValue::from(f),
                MetadataValue::String(s) => QdrantValue::from(s),
            };
            (key, value)
        })
        .collect();

    payload.insert(RECORD_ID_KEY.to_string(), QdrantValue::from(record_id.to_string()));
    payload
}

/// Split a stored payload back into the record id and caller metadata.
///
/// Non-scalar payload values are dropped.
fn payload_to_metadata(mut payload: HashMap<String, QdrantValue>) -> (Option<String>, Metadata) {
    use qdrant::value::Kind;

    let record_id = payload.remove(RECORD_ID_KEY).and_then(|v| match v.kind {
        Some(Kind::StringValue(s)) => Some(s),
        _ => None,
    });

    let metadata = payload
        .into_iter()
        .filter_map(|(key, value)| {
            let value = match value.kind {
                Some(Kind::BoolValue(b)) => MetadataValue::Bool(b),
                Some(Kind::IntegerValue(i)) => MetadataValue::Integer(i),
                Some(Kind::DoubleValue(f)) => MetadataValue::Float(f),
                Some(Kind::StringValue(s)) => MetadataValue::String(s),
                _ => return None,
            };
            Some((key, value))
        })
        .collect();

    (record_id, metadata)
}

fn to_query_result(
    id: Option<PointId>,
    score: Option<f32>,
    payload: HashMap<String, QdrantValue>,
) -> VectorResult<QueryResult> {
    let (record_id, metadata) = payload_to_metadata(payload);
    let id = record_id
        .or_else(|| id.as_ref().and_then(point_id_to_string))
        .ok_or_else(|| VectorError::Internal("Missing point ID".to_string()))?;

    Ok(QueryResult::new(id, score, metadata))
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn upsert(&self, records: Vec<VectorRecord>, namespace: &str) -> VectorResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        for record in &records {
            check_dimension(&record.values, self.dimension, &record.id)?;
        }

        let name = self.collection_name(namespace);
        self.ensure_collection(&name).await?;

        let count = records.len();
        let points: Vec<PointStruct> = records
            .into_iter()
            .map(|r| {
                PointStruct::new(
                    point_id_for(&r.id),
                    r.values,
                    metadata_to_payload(&r.id, r.metadata),
                )
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&name, points).wait(true))
            .await?;

        debug!(collection = %name, count, "Upserted points");
        Ok(count)
    }

    async fn query(
        &self,
        vector: Vec<f32>,
        top_k: usize,
        namespace: &str,
    ) -> VectorResult<Vec<QueryResult>> {
        check_dimension(&vector, self.dimension, "query")?;

        let name = self.collection_name(namespace);
        if top_k == 0 || !self.client.collection_exists(&name).await? {
            return Ok(vec![]);
        }

        let response = self
            .client
            .search_points(SearchPointsBuilder::new(&name, vector, top_k as u64).with_payload(true))
            .await?;

        response
            .result
            .into_iter()
            .map(|point| to_query_result(point.id, Some(point.score), point.payload))
            .collect()
    }

    /// Uses a payload scroll instead of a zero-vector search: cosine
    /// collections cannot score a zero vector. Results carry a 0.0 score.
    async fn fetch_all(&self, namespace: &str, limit: usize) -> VectorResult<Vec<QueryResult>> {
        let name = self.collection_name(namespace);
        if limit == 0 || !self.client.collection_exists(&name).await? {
            return Ok(vec![]);
        }

        let limit = u32::try_from(limit).unwrap_or(u32::MAX);
        let response = self
            .client
            .scroll(ScrollPointsBuilder::new(&name).limit(limit).with_payload(true))
            .await?;

        response
            .result
            .into_iter()
            .map(|point| to_query_result(point.id, None, point.payload))
            .collect()
    }

    async fn delete(&self, ids: Vec<String>, namespace: &str) -> VectorResult<usize> {
        let name = self.collection_name(namespace);
        if ids.is_empty() || !self.client.collection_exists(&name).await? {
            return Ok(0);
        }

        let point_ids: Vec<PointId> = ids.iter().map(|id| point_id_for(id)).collect();
        let count = point_ids.len();

        self.client
            .delete_points(DeletePointsBuilder::new(&name).points(point_ids).wait(true))
            .await?;

        Ok(count)
    }

    async fn count(&self, namespace: &str) -> VectorResult<usize> {
        let name = self.collection_name(namespace);
        if !self.client.collection_exists(&name).await? {
            return Ok(0);
        }

        let response = self
            .client
            .count(CountPointsBuilder::new(&name).exact(true))
            .await?;

        Ok(response.result.map_or(0, |r| r.count as usize))
    }
}
