use super::{Collection, DocumentStore};
use crate::error::{Result, ScraperError};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// One call made against the store, kept for inspection in development and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Find { collection: Collection, key: String },
    FindAll { collection: Collection },
    Insert { collection: Collection, key: String },
    Update { collection: Collection, key: String, fields: Vec<String> },
    Delete { collection: Collection, key: String },
}

impl StoreOp {
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            StoreOp::Insert { .. } | StoreOp::Update { .. } | StoreOp::Delete { .. }
        )
    }
}

/// In-memory storage implementation for development/testing
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    documents: Arc<Mutex<HashMap<Collection, BTreeMap<String, Value>>>>,
    journal: Arc<Mutex<Vec<StoreOp>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every operation issued so far, oldest first.
    pub fn operations(&self) -> Vec<StoreOp> {
        self.journal.lock().map(|j| j.clone()).unwrap_or_default()
    }

    pub fn write_count(&self) -> usize {
        self.operations().iter().filter(|op| op.is_write()).count()
    }

    pub fn clear_operations(&self) {
        if let Ok(mut journal) = self.journal.lock() {
            journal.clear();
        }
    }

    fn documents(&self) -> Result<MutexGuard<'_, HashMap<Collection, BTreeMap<String, Value>>>> {
        self.documents
            .lock()
            .map_err(|_| ScraperError::persistence("in-memory store lock poisoned"))
    }

    fn record(&self, op: StoreOp) {
        if let Ok(mut journal) = self.journal.lock() {
            journal.push(op);
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn find_by_key(&self, collection: Collection, key: &str) -> Result<Option<Value>> {
        self.record(StoreOp::Find {
            collection,
            key: key.to_string(),
        });
        let documents = self.documents()?;
        Ok(documents
            .get(&collection)
            .and_then(|c| c.get(key))
            .cloned())
    }

    async fn find_all(&self, collection: Collection) -> Result<Vec<Value>> {
        self.record(StoreOp::FindAll { collection });
        let documents = self.documents()?;
        Ok(documents
            .get(&collection)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn insert_one(&self, collection: Collection, doc: Value) -> Result<()> {
        let key = collection.key_of(&doc)?;
        self.record(StoreOp::Insert {
            collection,
            key: key.clone(),
        });
        let mut documents = self.documents()?;
        let docs = documents.entry(collection).or_default();
        if docs.contains_key(&key) {
            return Err(ScraperError::AlreadyExists {
                entity: collection.entity(),
                id: key,
            });
        }
        debug!("Inserted {} document {}", collection, key);
        docs.insert(key, doc);
        Ok(())
    }

    async fn update_one(
        &self,
        collection: Collection,
        key: &str,
        fields: Map<String, Value>,
    ) -> Result<bool> {
        self.record(StoreOp::Update {
            collection,
            key: key.to_string(),
            fields: fields.keys().cloned().collect(),
        });
        let mut documents = self.documents()?;
        let Some(Value::Object(doc)) = documents.get_mut(&collection).and_then(|c| c.get_mut(key))
        else {
            return Ok(false);
        };
        for (field, value) in fields {
            doc.insert(field, value);
        }
        debug!("Updated {} document {}", collection, key);
        Ok(true)
    }

    async fn delete_one(&self, collection: Collection, key: &str) -> Result<bool> {
        self.record(StoreOp::Delete {
            collection,
            key: key.to_string(),
        });
        let mut documents = self.documents()?;
        let removed = documents
            .get_mut(&collection)
            .and_then(|c| c.remove(key))
            .is_some();
        if removed {
            debug!("Deleted {} document {}", collection, key);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_find_update_delete() {
        let store = InMemoryDocumentStore::new();
        store
            .insert_one(Collection::Students, json!({ "studentId": "s1", "currentDisciplines": [] }))
            .await
            .unwrap();

        let mut fields = Map::new();
        fields.insert("currentDisciplines".to_string(), json!(["10843"]));
        assert!(store.update_one(Collection::Students, "s1", fields).await.unwrap());

        let doc = store.find_by_key(Collection::Students, "s1").await.unwrap().unwrap();
        assert_eq!(doc["currentDisciplines"], json!(["10843"]));
        assert_eq!(doc["studentId"], json!("s1"));

        assert!(store.delete_one(Collection::Students, "s1").await.unwrap());
        assert!(!store.delete_one(Collection::Students, "s1").await.unwrap());
        assert!(store.find_by_key(Collection::Students, "s1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_collections_are_separate() {
        let store = InMemoryDocumentStore::new();
        store
            .insert_one(Collection::Disciplines, json!({ "disciplineId": "1" }))
            .await
            .unwrap();
        assert!(store.find_by_key(Collection::Students, "1").await.unwrap().is_none());
        assert_eq!(store.find_all(Collection::Disciplines).await.unwrap().len(), 1);
        assert!(store.find_all(Collection::Students).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_insert_and_missing_update() {
        let store = InMemoryDocumentStore::new();
        let doc = json!({ "disciplineId": "1" });
        store.insert_one(Collection::Disciplines, doc.clone()).await.unwrap();
        assert!(matches!(
            store.insert_one(Collection::Disciplines, doc).await,
            Err(ScraperError::AlreadyExists { .. })
        ));
        assert!(!store
            .update_one(Collection::Disciplines, "2", Map::new())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_journal_tracks_writes() {
        let store = InMemoryDocumentStore::new();
        store.find_by_key(Collection::Disciplines, "1").await.unwrap();
        store
            .insert_one(Collection::Disciplines, json!({ "disciplineId": "1" }))
            .await
            .unwrap();
        assert_eq!(store.operations().len(), 2);
        assert_eq!(store.write_count(), 1);
        store.clear_operations();
        assert!(store.operations().is_empty());
    }
}
