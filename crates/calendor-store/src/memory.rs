use crate::filter::{sort_documents, Filter, SortKey};
use crate::store::{apply_patch, DocumentStore};
use async_trait::async_trait;
use calendor_core::CalendorResult;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory document store using brute-force scans.
/// The default backend for tests and embedded use.
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, collection: &str, doc: Value) -> CalendorResult<()> {
        let mut collections = self.collections.write().await;
        collections.entry(collection.to_string()).or_default().push(doc);
        Ok(())
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> CalendorResult<Option<Value>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| filter.matches(d)).cloned()))
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        sort: &[SortKey],
        limit: Option<usize>,
    ) -> CalendorResult<Vec<Value>> {
        let collections = self.collections.read().await;
        let mut docs: Vec<Value> = collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default();
        sort_documents(&mut docs, sort);
        if let Some(limit) = limit {
            docs.truncate(limit);
        }
        Ok(docs)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        patch: Value,
    ) -> CalendorResult<bool> {
        let mut collections = self.collections.write().await;
        if let Some(docs) = collections.get_mut(collection) {
            if let Some(doc) = docs.iter_mut().find(|d| filter.matches(d)) {
                apply_patch(doc, &patch);
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        patch: Value,
    ) -> CalendorResult<u64> {
        let mut collections = self.collections.write().await;
        let mut updated = 0;
        if let Some(docs) = collections.get_mut(collection) {
            for doc in docs.iter_mut().filter(|d| filter.matches(d)) {
                apply_patch(doc, &patch);
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn count(&self, collection: &str, filter: &Filter) -> CalendorResult<usize> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).count())
            .unwrap_or(0))
    }
}
