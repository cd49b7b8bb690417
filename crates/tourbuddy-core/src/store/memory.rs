//! InMemoryStore - HashMap-backed document store for testing and demos.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use super::{Document, Fields, Filter, RemoteStore, StoreError};

/// Counts of store calls by kind, for asserting what an operation touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCalls {
    pub queries: usize,
    pub creates: usize,
    pub updates: usize,
    pub deletes: usize,
}

impl StoreCalls {
    pub fn total(&self) -> usize {
        self.queries + self.creates + self.updates + self.deletes
    }
}

#[derive(Default)]
struct Inner {
    // Vec keeps insertion order, which is the order queries return
    collections: HashMap<String, Vec<Document>>,
    next_id: u64,
    calls: StoreCalls,
    offline: bool,
    fail_queries: bool,
}

/// In-memory document store.
///
/// Ids are assigned sequentially (`doc-1`, `doc-2`, ...). Clone-friendly via
/// Arc; clones share the same documents. `set_offline` and
/// `set_fail_queries` inject `StoreError::Unavailable` failures.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail as if the backend were unreachable.
    pub fn set_offline(&self, offline: bool) {
        if let Ok(mut inner) = self.inner.write() {
            inner.offline = offline;
        }
    }

    /// Make only `query` calls fail; writes still succeed.
    pub fn set_fail_queries(&self, fail: bool) {
        if let Ok(mut inner) = self.inner.write() {
            inner.fail_queries = fail;
        }
    }

    pub fn calls(&self) -> StoreCalls {
        self.inner.read().map(|inner| inner.calls).unwrap_or_default()
    }

    /// Snapshot of a collection, bypassing call counting and faults.
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.inner
            .read()
            .ok()
            .and_then(|inner| inner.collections.get(collection).cloned())
            .unwrap_or_default()
    }

    /// Insert a document directly, bypassing call counting. Returns its id.
    pub fn seed(&self, collection: &str, fields: Fields) -> String {
        let mut inner = match self.inner.write() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        };
        Self::insert(&mut inner, collection, fields)
    }

    fn insert(inner: &mut Inner, collection: &str, fields: Fields) -> String {
        inner.next_id += 1;
        let id = format!("doc-{}", inner.next_id);
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(Document {
                id: id.clone(),
                fields,
            });
        id
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Inner>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".into()))
    }

    fn check_online(inner: &Inner) -> Result<(), StoreError> {
        if inner.offline {
            Err(StoreError::Unavailable("store offline".into()))
        } else {
            Ok(())
        }
    }

    fn missing(collection: &str, id: &str) -> StoreError {
        StoreError::NotFound(format!("{}/{}", collection, id))
    }
}

#[async_trait]
impl RemoteStore for InMemoryStore {
    async fn query(&self, collection: &str, filter: Option<&Filter>) -> Result<Vec<Document>, StoreError> {
        let mut inner = self.write()?;
        inner.calls.queries += 1;
        Self::check_online(&inner)?;
        if inner.fail_queries {
            return Err(StoreError::Unavailable("query failed".into()));
        }

        let docs = inner
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| filter.map_or(true, |f| f.matches(&doc.fields)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(docs)
    }

    async fn create(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        let mut inner = self.write()?;
        inner.calls.creates += 1;
        Self::check_online(&inner)?;
        Ok(Self::insert(&mut inner, collection, fields))
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        inner.calls.updates += 1;
        Self::check_online(&inner)?;

        let doc = inner
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|doc| doc.id == id))
            .ok_or_else(|| Self::missing(collection, id))?;
        doc.fields = fields;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        inner.calls.deletes += 1;
        Self::check_online(&inner)?;

        let docs = inner
            .collections
            .get_mut(collection)
            .ok_or_else(|| Self::missing(collection, id))?;
        let before = docs.len();
        docs.retain(|doc| doc.id != id);
        if docs.len() == before {
            return Err(Self::missing(collection, id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: serde_json::Value) -> Fields {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_create_then_query_in_insertion_order() {
        let store = InMemoryStore::new();
        let a = store.create("trips", fields(json!({"name": "Goa"}))).await.unwrap();
        let b = store.create("trips", fields(json!({"name": "Ooty"}))).await.unwrap();
        assert_ne!(a, b);

        let docs = store.query("trips", None).await.unwrap();
        let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec![a.as_str(), b.as_str()]);
    }

    #[tokio::test]
    async fn test_update_replaces_fields_wholesale() {
        let store = InMemoryStore::new();
        let id = store.seed("memories", fields(json!({"uri": "file:///a.jpg", "note": "beach"})));
        store
            .update("memories", &id, fields(json!({"note": "sunset"})))
            .await
            .unwrap();

        let doc = &store.documents("memories")[0];
        assert_eq!(doc.fields.get("note"), Some(&json!("sunset")));
        assert!(doc.fields.get("uri").is_none());
    }

    #[tokio::test]
    async fn test_missing_ids_are_not_found() {
        let store = InMemoryStore::new();
        let err = store.update("trips", "nope", Fields::new()).await.unwrap_err();
        assert!(err.is_not_found());
        let err = store.delete("trips", "nope").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_offline_counts_call_and_fails() {
        let store = InMemoryStore::new();
        store.set_offline(true);
        let err = store.query("trips", None).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert_eq!(store.calls().queries, 1);
    }
}
