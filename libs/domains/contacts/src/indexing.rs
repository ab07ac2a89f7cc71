use std::sync::Arc;

use domain_vector::{
    Metadata, QueryResult, RetrievalService, TextExtractor, VectorDocument, VectorStore,
};
use tracing::info;

use crate::error::ContactsResult;
use crate::models::{CanonicalRecord, UNKNOWN_CONTACT};

/// Embeddable text for a contact: its non-empty descriptive fields
pub struct ContactTextExtractor;

impl TextExtractor<CanonicalRecord> for ContactTextExtractor {
    fn extract(&self, record: &CanonicalRecord) -> Option<VectorDocument> {
        let name = (record.name != UNKNOWN_CONTACT).then_some(record.name.as_str());
        let fields: [&str; 7] = [
            name.unwrap_or_default(),
            &record.organization,
            &record.title,
            &record.email,
            &record.phone,
            &record.address,
            &record.note,
        ];
        let text = fields
            .iter()
            .map(|field| field.trim())
            .filter(|field| !field.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if text.is_empty() {
            return None;
        }

        let mut metadata = Metadata::new();
        metadata.insert("name".to_string(), record.name.clone().into());
        metadata.insert("email".to_string(), record.email.clone().into());
        metadata.insert("organization".to_string(), record.organization.clone().into());
        metadata.insert("category".to_string(), "contact".into());

        Some(VectorDocument::new(record.id.clone(), text).with_metadata(metadata))
    }
}

/// Vector namespace holding one owner's contacts within `namespace`.
///
/// Owner bytes outside `[A-Za-z0-9_-]` are written as `.{hex}`, so distinct
/// owners never share a namespace and the result stays a valid collection
/// name.
pub fn owner_namespace(namespace: &str, owner: &str) -> String {
    let mut scoped = String::with_capacity(namespace.len() + owner.len() + 1);
    scoped.push_str(namespace);
    scoped.push('.');
    for byte in owner.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            scoped.push(byte as char);
        } else {
            scoped.push_str(&format!(".{:02x}", byte));
        }
    }
    scoped
}

/// Pushes an owner's contacts into the vector index and searches them.
///
/// Every owner gets its own namespace (see [`owner_namespace`]); record
/// ids are only unique per owner, and search never crosses owners.
/// Re-indexing replaces earlier vectors with the same record id.
pub struct ContactIndexer<S: VectorStore> {
    retrieval: Arc<RetrievalService<S>>,
}

impl<S: VectorStore> ContactIndexer<S> {
    pub fn new(retrieval: Arc<RetrievalService<S>>) -> Self {
        Self { retrieval }
    }

    pub async fn index(
        &self,
        owner: &str,
        records: &[CanonicalRecord],
        namespace: &str,
    ) -> ContactsResult<usize> {
        let documents: Vec<VectorDocument> = ContactTextExtractor
            .extract_all(records)
            .into_iter()
            .map(|mut doc| {
                doc.metadata.insert("owner".to_string(), owner.into());
                doc
            })
            .collect();

        let scoped = owner_namespace(namespace, owner);
        let indexed = self.retrieval.index_documents(documents, &scoped).await?;
        info!(owner = %owner, namespace = %scoped, count = indexed, "Indexed contacts");
        Ok(indexed)
    }

    /// Similarity search restricted to `owner`'s contacts
    pub async fn search(
        &self,
        owner: &str,
        query: &str,
        top_k: usize,
        namespace: &str,
    ) -> ContactsResult<Vec<QueryResult>> {
        let scoped = owner_namespace(namespace, owner);
        Ok(self.retrieval.similarity_search(query, top_k, &scoped).await?)
    }

    /// Best-effort sample of `owner`'s indexed contacts
    pub async fn sample(
        &self,
        owner: &str,
        namespace: &str,
        limit: usize,
    ) -> ContactsResult<Vec<QueryResult>> {
        let scoped = owner_namespace(namespace, owner);
        Ok(self.retrieval.fetch_all(&scoped, limit).await?)
    }
}
