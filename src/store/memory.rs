//! In-memory `EntityStore` for tests and offline development.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use super::{EntityStore, ListQuery, StoreError};

/// Keeps every collection in a `HashMap` guarded by one lock. Insertion
/// order is preserved per collection so listings come back stable.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    collections: HashMap<&'static str, Vec<Value>>,
    failing: HashSet<&'static str>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every write to `collection` fail with a transport error until
    /// [`clear_failures`](Self::clear_failures) is called. Lets tests check
    /// that best-effort side writes do not poison the primary operation.
    pub fn fail_writes(&self, collection: &'static str) {
        if let Ok(mut inner) = self.inner.write() {
            inner.failing.insert(collection);
        }
    }

    pub fn clear_failures(&self) {
        if let Ok(mut inner) = self.inner.write() {
            inner.failing.clear();
        }
    }

    fn check_writable(inner: &Inner, collection: &'static str) -> Result<(), StoreError> {
        if inner.failing.contains(collection) {
            return Err(StoreError::Transport(format!(
                "injected write failure for {collection}"
            )));
        }
        Ok(())
    }

    fn doc_id(doc: &Value) -> Option<&str> {
        doc.get("id").and_then(Value::as_str)
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn list(
        &self,
        collection: &'static str,
        query: &ListQuery,
    ) -> Result<Vec<Value>, StoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| StoreError::Transport("store lock poisoned".into()))?;
        Ok(inner
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| query.matches(doc))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get(&self, collection: &'static str, id: &str) -> Result<Value, StoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| StoreError::Transport("store lock poisoned".into()))?;
        inner
            .collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| Self::doc_id(doc) == Some(id)))
            .cloned()
            .ok_or_else(|| StoreError::Missing {
                collection,
                id: id.to_string(),
            })
    }

    async fn create(
        &self,
        collection: &'static str,
        mut document: Value,
    ) -> Result<Value, StoreError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| StoreError::Transport("store lock poisoned".into()))?;
        Self::check_writable(&inner, collection)?;

        if Self::doc_id(&document).map_or(true, str::is_empty) {
            if let Value::Object(fields) = &mut document {
                fields.insert("id".into(), Value::String(Uuid::new_v4().to_string()));
            }
        }
        inner
            .collections
            .entry(collection)
            .or_default()
            .push(document.clone());
        Ok(document)
    }

    async fn patch(
        &self,
        collection: &'static str,
        id: &str,
        changes: Value,
    ) -> Result<Value, StoreError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| StoreError::Transport("store lock poisoned".into()))?;
        Self::check_writable(&inner, collection)?;

        let doc = inner
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|doc| Self::doc_id(doc) == Some(id)))
            .ok_or_else(|| StoreError::Missing {
                collection,
                id: id.to_string(),
            })?;

        if let (Value::Object(fields), Value::Object(updates)) = (&mut *doc, changes) {
            for (key, value) in updates {
                fields.insert(key, value);
            }
        }
        Ok(doc.clone())
    }

    async fn replace(
        &self,
        collection: &'static str,
        id: &str,
        mut document: Value,
    ) -> Result<Value, StoreError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| StoreError::Transport("store lock poisoned".into()))?;
        Self::check_writable(&inner, collection)?;

        let doc = inner
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|doc| Self::doc_id(doc) == Some(id)))
            .ok_or_else(|| StoreError::Missing {
                collection,
                id: id.to_string(),
            })?;

        if let Value::Object(fields) = &mut document {
            fields.insert("id".into(), Value::String(id.to_string()));
        }
        *doc = document.clone();
        Ok(document)
    }

    async fn delete(&self, collection: &'static str, id: &str) -> Result<(), StoreError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| StoreError::Transport("store lock poisoned".into()))?;
        Self::check_writable(&inner, collection)?;

        let docs = inner
            .collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::Missing {
                collection,
                id: id.to_string(),
            })?;
        let before = docs.len();
        docs.retain(|doc| Self::doc_id(doc) != Some(id));
        if docs.len() == before {
            return Err(StoreError::Missing {
                collection,
                id: id.to_string(),
            });
        }
        Ok(())
    }
}
