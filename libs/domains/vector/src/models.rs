use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{VectorError, VectorResult};

/// Scalar metadata value attached to a vector.
///
/// Serialized untagged so metadata reads as a plain JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl MetadataValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::String(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::String(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Integer(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Float(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Bool(value)
    }
}

/// Metadata mapping, ordered by key
pub type Metadata = BTreeMap<String, MetadataValue>;

/// A stored vector. Replaced wholesale on upsert, never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl VectorRecord {
    pub fn new(id: impl Into<String>, values: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            values,
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Assemble records from parallel slices.
    ///
    /// All three inputs must have the same length; a mismatch or an empty id
    /// is a caller error.
    pub fn zip(
        vectors: Vec<Vec<f32>>,
        ids: Vec<String>,
        metadata: Vec<Metadata>,
    ) -> VectorResult<Vec<Self>> {
        if vectors.len() != ids.len() || ids.len() != metadata.len() {
            return Err(VectorError::Validation(format!(
                "Length mismatch: {} vectors, {} ids, {} metadata entries",
                vectors.len(),
                ids.len(),
                metadata.len()
            )));
        }

        if ids.iter().any(|id| id.is_empty()) {
            return Err(VectorError::Validation("Vector id must not be empty".to_string()));
        }

        Ok(vectors
            .into_iter()
            .zip(ids)
            .zip(metadata)
            .map(|((values, id), metadata)| Self {
                id,
                values,
                metadata,
            })
            .collect())
    }
}

/// One match from a similarity query or a sampling listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub id: String,
    /// Cosine similarity in [-1, 1]; 0.0 when the store reports no score
    pub score: f32,
    pub metadata: Metadata,
}

impl QueryResult {
    pub fn new(id: impl Into<String>, score: Option<f32>, metadata: Metadata) -> Self {
        Self {
            id: id.into(),
            score: score.filter(|s| !s.is_nan()).unwrap_or(0.0),
            metadata,
        }
    }
}

/// Text to be embedded together with the metadata stored alongside it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorDocument {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl VectorDocument {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// 3-series OpenAI models, the only ones that accept a `dimensions` override
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShortenableModel {
    TextEmbedding3Small,
    TextEmbedding3Large,
}

impl ShortenableModel {
    pub fn model_name(&self) -> &'static str {
        match self {
            ShortenableModel::TextEmbedding3Small => "text-embedding-3-small",
            ShortenableModel::TextEmbedding3Large => "text-embedding-3-large",
        }
    }

    /// Native output dimension before truncation
    pub fn full_dimension(&self) -> u32 {
        match self {
            ShortenableModel::TextEmbedding3Small => 1536,
            ShortenableModel::TextEmbedding3Large => 3072,
        }
    }
}

/// Embedding model selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EmbeddingModel {
    /// OpenAI text-embedding-ada-002 (1536 dimensions)
    #[default]
    TextEmbeddingAda002,
    /// OpenAI text-embedding-3-small (1536 dimensions)
    TextEmbedding3Small,
    /// OpenAI text-embedding-3-large (3072 dimensions)
    TextEmbedding3Large,
    /// A 3-series model truncated to `dimension`
    Custom {
        model: ShortenableModel,
        dimension: u32,
    },
}

impl EmbeddingModel {
    pub fn dimension(&self) -> u32 {
        match self {
            EmbeddingModel::TextEmbeddingAda002 => 1536,
            EmbeddingModel::TextEmbedding3Small => 1536,
            EmbeddingModel::TextEmbedding3Large => 3072,
            EmbeddingModel::Custom { dimension, .. } => *dimension,
        }
    }

    pub fn model_name(&self) -> &str {
        match self {
            EmbeddingModel::TextEmbeddingAda002 => "text-embedding-ada-002",
            EmbeddingModel::TextEmbedding3Small => "text-embedding-3-small",
            EmbeddingModel::TextEmbedding3Large => "text-embedding-3-large",
            EmbeddingModel::Custom { model, .. } => model.model_name(),
        }
    }

    /// `dimensions` request parameter, set only for truncated models
    pub fn requested_dimensions(&self) -> Option<u32> {
        match self {
            EmbeddingModel::Custom { dimension, .. } => Some(*dimension),
            _ => None,
        }
    }
}

impl fmt::Display for EmbeddingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmbeddingModel::Custom { model, dimension } => {
                write!(f, "{}:{}", model.model_name(), dimension)
            }
            _ => f.write_str(self.model_name()),
        }
    }
}

/// Accepts a model name, or `name:dimension` for a truncated 3-series model
impl FromStr for EmbeddingModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "text-embedding-ada-002" => Ok(EmbeddingModel::TextEmbeddingAda002),
            "text-embedding-3-small" => Ok(EmbeddingModel::TextEmbedding3Small),
            "text-embedding-3-large" => Ok(EmbeddingModel::TextEmbedding3Large),
            other => {
                let (name, dim) = other
                    .split_once(':')
                    .ok_or_else(|| format!("unknown embedding model '{}'", other))?;
                let model = match name {
                    "text-embedding-3-small" => ShortenableModel::TextEmbedding3Small,
                    "text-embedding-3-large" => ShortenableModel::TextEmbedding3Large,
                    _ => {
                        return Err(format!(
                            "embedding model '{}' does not support a custom dimension",
                            name
                        ));
                    }
                };
                let dimension = dim
                    .parse::<u32>()
                    .ok()
                    .filter(|d| (1..=model.full_dimension()).contains(d))
                    .ok_or_else(|| format!("invalid embedding dimension '{}' for {}", dim, name))?;
                Ok(EmbeddingModel::Custom { model, dimension })
            }
        }
    }
}
