use std::sync::Arc;

use async_trait::async_trait;
use domain_vector::{
    EmbeddingModel, EmbeddingProvider, InMemoryVectorStore, Metadata, RetrievalConfig,
    RetrievalService, ShortenableModel, VectorDocument, VectorResult, VectorStore,
};
use test_utils::assertions::assert_same_ids;

const DIM: usize = 16;

/// Bag-of-words embedder: each lowercase word bumps one bucket
struct WordBuckets;

#[async_trait]
impl EmbeddingProvider for WordBuckets {
    fn model(&self) -> EmbeddingModel {
        EmbeddingModel::Custom {
            model: ShortenableModel::TextEmbedding3Small,
            dimension: DIM as u32,
        }
    }

    async fn embed(&self, texts: &[String]) -> VectorResult<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut v = vec![0.0; DIM];
                for word in text.split_whitespace() {
                    let bucket = word
                        .to_lowercase()
                        .bytes()
                        .fold(7usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
                    v[bucket % DIM] += 1.0;
                }
                v
            })
            .collect())
    }
}

fn service(store: InMemoryVectorStore) -> RetrievalService<InMemoryVectorStore> {
    RetrievalService::new(
        store,
        RetrievalConfig {
            batch_size: 2,
            ..RetrievalConfig::default()
        },
    )
    .with_embedding_provider(Arc::new(WordBuckets))
}

fn metadata(pairs: &[(&str, &str)]) -> Metadata {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), (*v).into()))
        .collect()
}

#[tokio::test]
async fn test_upsert_then_query_returns_best_match_first() {
    let store = InMemoryVectorStore::new(3);
    let service = RetrievalService::new(store.clone(), RetrievalConfig::default());

    service
        .upsert(
            vec![vec![0.2, 1.0, 0.0]],
            vec!["other".to_string()],
            vec![Metadata::new()],
            "ns",
        )
        .await
        .unwrap();
    service
        .upsert(
            vec![vec![1.0, 0.0, 0.0]],
            vec!["target".to_string()],
            vec![metadata(&[("k", "x")])],
            "ns",
        )
        .await
        .unwrap();

    let results = service.query(vec![1.0, 0.0, 0.0], 1, "ns").await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "target");
    assert_eq!(results[0].metadata, metadata(&[("k", "x")]));

    let all = store.query(vec![1.0, 0.0, 0.0], 10, "ns").await.unwrap();
    assert!(all.iter().all(|r| results[0].score >= r.score));
}

#[tokio::test]
async fn test_index_then_similarity_search() {
    let service = service(InMemoryVectorStore::new(DIM));

    let docs = vec![
        VectorDocument::new("1", "Ada Lovelace analytical engine")
            .with_metadata(metadata(&[("name", "Ada Lovelace")])),
        VectorDocument::new("2", "Grace Hopper compiler navy"),
        VectorDocument::new("3", "Alan Turing computing machinery"),
    ];

    assert_eq!(service.index_documents(docs, "people").await.unwrap(), 3);
    assert_eq!(service.count("people").await.unwrap(), 3);

    let hits = service
        .similarity_search("analytical engine", 2, "people")
        .await
        .unwrap();

    assert!(hits.len() <= 2);
    assert_eq!(hits[0].id, "1");
    assert_eq!(
        hits[0].metadata.get("name").and_then(|v| v.as_str()),
        Some("Ada Lovelace")
    );
    assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
}

#[tokio::test]
async fn test_fetch_all_on_empty_namespace_is_empty() {
    let service = service(InMemoryVectorStore::new(DIM));
    assert!(service.fetch_all("nothing-here", 50).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_top_k_larger_than_namespace() {
    let service = service(InMemoryVectorStore::new(DIM));
    service
        .index_documents(vec![VectorDocument::new("only", "single record")], "ns")
        .await
        .unwrap();

    let hits = service.similarity_search("single", 10, "ns").await.unwrap();
    let ids: Vec<String> = hits.into_iter().map(|r| r.id).collect();
    assert_same_ids(&ids, &["only"], "top_k beyond namespace size");
}

#[tokio::test]
async fn test_delete_removes_from_results() {
    let service = service(InMemoryVectorStore::new(DIM));
    service
        .index_documents(
            vec![
                VectorDocument::new("a", "alpha"),
                VectorDocument::new("b", "beta"),
            ],
            "ns",
        )
        .await
        .unwrap();

    service.delete(vec!["a".to_string()], "ns").await.unwrap();

    let remaining = service.fetch_all("ns", 10).await.unwrap();
    let ids: Vec<String> = remaining.into_iter().map(|r| r.id).collect();
    assert_same_ids(&ids, &["b"], "after deleting a");
}
