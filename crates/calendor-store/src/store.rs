use crate::filter::{Filter, SortKey};
use async_trait::async_trait;
use calendor_core::CalendorResult;
use serde_json::Value;

/// Backend trait for a schema-less document store.
///
/// Operations are eventually consistent with no cross-call atomicity: a
/// crash between two writes can leave related documents out of step, which
/// the runtime tolerates by design.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert one document into a collection.
    async fn insert(&self, collection: &str, doc: Value) -> CalendorResult<()>;

    /// Return the first document matching the filter, in insertion order.
    async fn find_one(&self, collection: &str, filter: &Filter) -> CalendorResult<Option<Value>>;

    /// Return matching documents, sorted, optionally limited.
    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        sort: &[SortKey],
        limit: Option<usize>,
    ) -> CalendorResult<Vec<Value>>;

    /// Merge the patch's top-level fields into the first matching document.
    /// Returns whether a document was updated.
    async fn update_one(&self, collection: &str, filter: &Filter, patch: Value)
        -> CalendorResult<bool>;

    /// Merge the patch's top-level fields into every matching document.
    /// Returns the number of documents updated.
    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        patch: Value,
    ) -> CalendorResult<u64>;

    /// Count documents matching the filter.
    async fn count(&self, collection: &str, filter: &Filter) -> CalendorResult<usize>;
}

/// Merge `patch`'s top-level object fields into `doc` in place.
pub(crate) fn apply_patch(doc: &mut Value, patch: &Value) {
    if let (Some(target), Some(fields)) = (doc.as_object_mut(), patch.as_object()) {
        for (key, value) in fields {
            target.insert(key.clone(), value.clone());
        }
    }
}
