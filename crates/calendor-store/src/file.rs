use crate::filter::{sort_documents, Filter, SortKey};
use crate::store::{apply_patch, DocumentStore};
use async_trait::async_trait;
use calendor_core::{CalendorError, CalendorResult};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// File-based document store: one JSON file per collection under a data
/// directory. Good enough for a single-process deployment.
///
/// Collections are cached in memory after first access and rewritten in
/// full after every mutation.
pub struct JsonFileStore {
    dir: PathBuf,
    collections: RwLock<HashMap<String, Vec<Value>>>,
}

impl JsonFileStore {
    pub async fn new(dir: impl Into<PathBuf>) -> CalendorResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            collections: RwLock::new(HashMap::new()),
        })
    }

    fn collection_path(&self, collection: &str) -> PathBuf {
        self.dir.join(format!("{collection}.json"))
    }

    async fn load_from_disk(path: &Path) -> CalendorResult<Vec<Value>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let data = tokio::fs::read_to_string(path).await?;
        serde_json::from_str(&data)
            .map_err(|e| CalendorError::Store(format!("corrupt collection file {path:?}: {e}")))
    }

    /// Ensure the named collection is cached, loading it from disk if needed.
    async fn ensure_loaded(&self, collection: &str) -> CalendorResult<()> {
        {
            let cached = self.collections.read().await;
            if cached.contains_key(collection) {
                return Ok(());
            }
        }
        let docs = Self::load_from_disk(&self.collection_path(collection)).await?;
        tracing::debug!(collection, doc_count = docs.len(), "collection loaded from disk");
        let mut cached = self.collections.write().await;
        cached.entry(collection.to_string()).or_insert(docs);
        Ok(())
    }

    async fn persist(&self, collection: &str, docs: &[Value]) -> CalendorResult<()> {
        let json = serde_json::to_string_pretty(docs)?;
        tokio::fs::write(self.collection_path(collection), json).await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for JsonFileStore {
    async fn insert(&self, collection: &str, doc: Value) -> CalendorResult<()> {
        self.ensure_loaded(collection).await?;
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        docs.push(doc);
        let snapshot = docs.clone();
        drop(collections);
        self.persist(collection, &snapshot).await
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> CalendorResult<Option<Value>> {
        self.ensure_loaded(collection).await?;
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
        self.ensure_loaded(collection).await?;
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
        self.ensure_loaded(collection).await?;
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(false);
        };
        let Some(doc) = docs.iter_mut().find(|d| filter.matches(d)) else {
            return Ok(false);
        };
        apply_patch(doc, &patch);
        let snapshot = docs.clone();
        drop(collections);
        self.persist(collection, &snapshot).await?;
        Ok(true)
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        patch: Value,
    ) -> CalendorResult<u64> {
        self.ensure_loaded(collection).await?;
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let mut updated = 0;
        for doc in docs.iter_mut().filter(|d| filter.matches(d)) {
            apply_patch(doc, &patch);
            updated += 1;
        }
        if updated == 0 {
            return Ok(0);
        }
        let snapshot = docs.clone();
        drop(collections);
        self.persist(collection, &snapshot).await?;
        Ok(updated)
    }

    async fn count(&self, collection: &str, filter: &Filter) -> CalendorResult<usize> {
        self.ensure_loaded(collection).await?;
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).count())
            .unwrap_or(0))
    }
}
