use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::store::{field_matches, Document, DocumentStore, StoreError, StoreResult};

/// Process-local document store used for local runs and tests.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Value>>>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with `StoreError::Unavailable` until reset.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Inserts a document under a caller-chosen id.
    pub async fn insert_with_id(&self, collection: &str, id: &str, data: Value) {
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), data);
    }

    pub async fn count(&self, collection: &str) -> usize {
        let collections = self.collections.read().await;
        collections.get(collection).map(BTreeMap::len).unwrap_or(0)
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create(&self, collection: &str, data: Value) -> StoreResult<String> {
        self.check_online()?;
        let id = Uuid::new_v4().to_string();
        debug!("memory store: create {}/{}", collection, id);

        self.insert_with_id(collection, &id, data).await;
        Ok(id)
    }

    async fn list(&self, collection: &str) -> StoreResult<Vec<Document>> {
        self.check_online()?;
        let collections = self.collections.read().await;

        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, data)| Document::new(id.clone(), data.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn find_by(&self, collection: &str, field: &str, value: &str) -> StoreResult<Vec<Document>> {
        let docs = self.list(collection).await?;

        Ok(docs
            .into_iter()
            .filter(|doc| {
                if field == "id" {
                    doc.id == value
                } else {
                    field_matches(doc.field(field), value)
                }
            })
            .collect())
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        self.check_online()?;
        let collections = self.collections.read().await;

        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|data| Document::new(id, data.clone())))
    }

    async fn replace(&self, collection: &str, id: &str, data: Value) -> StoreResult<()> {
        self.check_online()?;
        let mut collections = self.collections.write().await;

        let slot = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        *slot = data;

        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        self.check_online()?;
        let mut collections = self.collections.write().await;

        if let Some(docs) = collections.get_mut(collection) {
            docs.remove(id);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_then_filter_by_field() {
        let store = MemoryStore::new();
        let id = store.create("agendamentos", json!({"medicoId": "m1", "horario": "09:00"})).await.unwrap();
        store.create("agendamentos", json!({"medicoId": "m2", "horario": "09:00"})).await.unwrap();

        let found = store.find_by("agendamentos", "medicoId", "m1").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, id);
    }

    #[tokio::test]
    async fn test_filter_matches_numeric_fields() {
        let store = MemoryStore::new();
        store.create("agendamentos", json!({"mes": 3})).await.unwrap();

        assert_eq!(store.find_by("agendamentos", "mes", "3").await.unwrap().len(), 1);
        assert!(store.find_by("agendamentos", "mes", "4").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replace_unknown_document_fails() {
        let store = MemoryStore::new();
        let result = store.replace("availability", "missing", json!({})).await;
        assert_matches!(result, Err(StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_offline_store_rejects_calls() {
        let store = MemoryStore::new();
        store.set_offline(true);
        assert_matches!(store.list("availability").await, Err(StoreError::Unavailable(_)));

        store.set_offline(false);
        assert!(store.list("availability").await.unwrap().is_empty());
    }
}
