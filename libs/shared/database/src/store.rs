//! The contract every document backend fulfils.
//!
//! Collections hold schemaless JSON documents. The only query shape is a
//! single field-equality filter; callers sort client-side.

use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Document store unavailable: {0}")]
    Unavailable(String),

    #[error("Document store rejected credentials: {0}")]
    PermissionDenied(String),

    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("Document store returned an unreadable payload: {0}")]
    Decode(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A stored document: the store-assigned id plus its field map.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    pub fn new(id: impl Into<String>, data: Value) -> Self {
        Self { id: id.into(), data }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Value::as_str)
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts a document and returns the generated id.
    async fn create(&self, collection: &str, data: Value) -> StoreResult<String>;

    async fn list(&self, collection: &str) -> StoreResult<Vec<Document>>;

    async fn find_by(&self, collection: &str, field: &str, value: &str) -> StoreResult<Vec<Document>>;

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Overwrites the whole document. Fails with `NotFound` when the id is unknown.
    async fn replace(&self, collection: &str, id: &str, data: Value) -> StoreResult<()>;

    /// Deleting an unknown id is not an error.
    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()>;
}

/// Compares a stored field against an equality-filter operand.
pub(crate) fn field_matches(value: Option<&Value>, expected: &str) -> bool {
    match value {
        Some(Value::String(s)) => s == expected,
        Some(Value::Number(n)) => n.to_string() == expected,
        Some(Value::Bool(b)) => b.to_string() == expected,
        _ => false,
    }
}
