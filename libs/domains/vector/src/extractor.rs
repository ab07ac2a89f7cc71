use crate::models::VectorDocument;

/// Composes the embeddable text of a domain item.
///
/// Deciding which fields describe an item is a domain concern, so the
/// retrieval layer only ever sees the resulting [`VectorDocument`].
pub trait TextExtractor<T>: Send + Sync {
    /// `None` when the item has nothing worth embedding
    fn extract(&self, item: &T) -> Option<VectorDocument>;

    fn extract_all(&self, items: &[T]) -> Vec<VectorDocument> {
        items.iter().filter_map(|item| self.extract(item)).collect()
    }
}
