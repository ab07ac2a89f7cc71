use async_trait::async_trait;

use crate::error::VectorResult;
use crate::models::EmbeddingModel;

/// Turns text into fixed-dimension vectors.
///
/// Implementations return exactly one vector per input, in input order, each
/// of `model().dimension()` length. There is no local fallback: a provider
/// that cannot embed fails the whole call.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Model whose vectors this provider produces
    fn model(&self) -> EmbeddingModel;

    async fn embed(&self, texts: &[String]) -> VectorResult<Vec<Vec<f32>>>;
}
