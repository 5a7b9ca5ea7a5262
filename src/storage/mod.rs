//! Document store boundary.
//!
//! The store holds JSON documents per collection, keyed by the collection's
//! identity field. Only keyed primitives are offered; set semantics on
//! student documents are done read-modify-write by the callers.

pub mod in_memory;
#[cfg(feature = "db")]
pub mod libsql_store;

use crate::constants::{
    DISCIPLINES_COLLECTION, DISCIPLINE_KEY_FIELD, STUDENTS_COLLECTION, STUDENT_KEY_FIELD,
};
use crate::error::{Result, ScraperError};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;

pub use in_memory::{InMemoryDocumentStore, StoreOp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Disciplines,
    Students,
}

impl Collection {
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Disciplines => DISCIPLINES_COLLECTION,
            Collection::Students => STUDENTS_COLLECTION,
        }
    }

    pub fn key_field(&self) -> &'static str {
        match self {
            Collection::Disciplines => DISCIPLINE_KEY_FIELD,
            Collection::Students => STUDENT_KEY_FIELD,
        }
    }

    pub fn entity(&self) -> &'static str {
        match self {
            Collection::Disciplines => "Discipline",
            Collection::Students => "Student",
        }
    }

    /// The identity value of `doc` in this collection.
    pub fn key_of(&self, doc: &Value) -> Result<String> {
        doc.get(self.key_field())
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                ScraperError::persistence(format!(
                    "document in '{}' has no string '{}'",
                    self.name(),
                    self.key_field()
                ))
            })
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_by_key(&self, collection: Collection, key: &str) -> Result<Option<Value>>;

    async fn find_all(&self, collection: Collection) -> Result<Vec<Value>>;

    /// Inserts a new document; its key is read from the collection's key field.
    async fn insert_one(&self, collection: Collection, doc: Value) -> Result<()>;

    /// Sets the given top-level fields on an existing document.
    /// Returns whether a document with `key` existed.
    async fn update_one(
        &self,
        collection: Collection,
        key: &str,
        fields: Map<String, Value>,
    ) -> Result<bool>;

    /// Returns whether a document was removed.
    async fn delete_one(&self, collection: Collection, key: &str) -> Result<bool>;
}
