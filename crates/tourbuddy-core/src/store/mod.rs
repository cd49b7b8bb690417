//! Remote document store abstraction.
//!
//! A `RemoteStore` holds named collections of schemaless documents. The
//! contract is deliberately small:
//!
//! - `query` returns every matching document, no pagination, with an
//!   optional exact-equality filter on one field
//! - `create` assigns and returns a new opaque id
//! - `update` replaces a document's fields wholesale and fails with
//!   `StoreError::NotFound` if the id is absent
//! - `delete` fails with `StoreError::NotFound` if the id is absent
//!
//! `FirestoreClient` (in `api`) talks to Cloud Firestore; `InMemoryStore` is
//! a local implementation used by tests and demos.

pub mod error;
pub mod memory;

use async_trait::async_trait;
use serde_json::{Map, Value};

pub use error::StoreError;
pub use memory::{InMemoryStore, StoreCalls};

/// Field map of a stored document.
pub type Fields = Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

/// Exact-match equality predicate on a single field.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, fields: &Fields) -> bool {
        fields.get(&self.field) == Some(&self.value)
    }
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn query(&self, collection: &str, filter: Option<&Filter>) -> Result<Vec<Document>, StoreError>;

    async fn create(&self, collection: &str, fields: Fields) -> Result<String, StoreError>;

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;
}
