//! Storage seam over the REST document store.
//!
//! Services hold an `Arc<dyn EntityStore>`: production wires in `RestStore`,
//! tests and offline development wire in `MemoryStore`. Documents cross the
//! seam as raw `serde_json::Value`; the typed helpers below decode them into
//! the model structs.

pub mod memory;
pub mod rest;

pub use memory::MemoryStore;
pub use rest::RestStore;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

// ─── Collections ──────────────────────────────────────────────────────────────

pub const APPOINTMENTS: &str = "appointments";
pub const NOTIFICATIONS: &str = "notifications";
pub const PRESCRIPTIONS: &str = "prescriptions";
pub const REVIEWS: &str = "reviews";

// ─── Errors ───────────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Cannot reach the document store: {0}")]
    Transport(String),

    #[error("Document store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Document in {collection} does not match the expected shape: {reason}")]
    Decode {
        collection: &'static str,
        reason: String,
    },

    #[error("No document in {collection} with id {id}")]
    Missing {
        collection: &'static str,
        id: String,
    },
}

// ─── Query ────────────────────────────────────────────────────────────────────

/// Equality filters for a collection listing, rendered as `?field=value`
/// pairs against the REST store.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    filters: Vec<(String, String)>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl ToString) -> Self {
        self.filters.push((field.to_string(), value.to_string()));
        self
    }

    pub fn filters(&self) -> &[(String, String)] {
        &self.filters
    }

    /// Whether a document satisfies every filter. Non-string fields compare
    /// through their JSON rendering, which is how the REST store treats
    /// query parameters too.
    pub fn matches(&self, doc: &Value) -> bool {
        self.filters.iter().all(|(field, want)| match doc.get(field) {
            Some(Value::String(have)) => have == want,
            Some(Value::Null) | None => false,
            Some(other) => other.to_string() == *want,
        })
    }
}

// ─── Trait ────────────────────────────────────────────────────────────────────

/// CRUD over JSON document collections.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn list(
        &self,
        collection: &'static str,
        query: &ListQuery,
    ) -> Result<Vec<Value>, StoreError>;

    /// A missing document is an error, not an empty result.
    async fn get(&self, collection: &'static str, id: &str) -> Result<Value, StoreError>;

    /// Stores a new document and returns it with the assigned id.
    async fn create(&self, collection: &'static str, document: Value)
        -> Result<Value, StoreError>;

    /// Shallow-merges `changes` into an existing document.
    async fn patch(
        &self,
        collection: &'static str,
        id: &str,
        changes: Value,
    ) -> Result<Value, StoreError>;

    /// Replaces the whole document, keeping the id.
    async fn replace(
        &self,
        collection: &'static str,
        id: &str,
        document: Value,
    ) -> Result<Value, StoreError>;

    async fn delete(&self, collection: &'static str, id: &str) -> Result<(), StoreError>;
}

// ─── Typed helpers ────────────────────────────────────────────────────────────

fn decode<T: DeserializeOwned>(collection: &'static str, doc: Value) -> Result<T, StoreError> {
    serde_json::from_value(doc).map_err(|e| StoreError::Decode {
        collection,
        reason: e.to_string(),
    })
}

fn encode<T: Serialize>(collection: &'static str, value: &T) -> Result<Value, StoreError> {
    serde_json::to_value(value).map_err(|e| StoreError::Decode {
        collection,
        reason: e.to_string(),
    })
}

/// Fetches and decodes one document.
pub async fn fetch_one<T: DeserializeOwned>(
    store: &dyn EntityStore,
    collection: &'static str,
    id: &str,
) -> Result<T, StoreError> {
    decode(collection, store.get(collection, id).await?)
}

/// Lists and decodes every document matching the query.
pub async fn fetch_all<T: DeserializeOwned>(
    store: &dyn EntityStore,
    collection: &'static str,
    query: &ListQuery,
) -> Result<Vec<T>, StoreError> {
    store
        .list(collection, query)
        .await?
        .into_iter()
        .map(|doc| decode(collection, doc))
        .collect()
}

/// Creates a document from a typed value, returning the stored form.
pub async fn insert<In: Serialize, Out: DeserializeOwned>(
    store: &dyn EntityStore,
    collection: &'static str,
    value: &In,
) -> Result<Out, StoreError> {
    let doc = encode(collection, value)?;
    decode(collection, store.create(collection, doc).await?)
}

/// Applies a partial update and decodes the updated document.
pub async fn update<T: DeserializeOwned>(
    store: &dyn EntityStore,
    collection: &'static str,
    id: &str,
    changes: Value,
) -> Result<T, StoreError> {
    decode(collection, store.patch(collection, id, changes).await?)
}

/// Full replace (PUT) from a typed value.
pub async fn overwrite<In: Serialize, Out: DeserializeOwned>(
    store: &dyn EntityStore,
    collection: &'static str,
    id: &str,
    value: &In,
) -> Result<Out, StoreError> {
    let doc = encode(collection, value)?;
    decode(collection, store.replace(collection, id, doc).await?)
}
