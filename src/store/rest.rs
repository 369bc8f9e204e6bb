//! `EntityStore` over the REST document store.
//!
//! Dialect: `GET /{collection}?field=value` lists with equality filters,
//! `GET/PATCH/PUT/DELETE /{collection}/{id}` target one document, `POST
//! /{collection}` stores a new one and returns it with the assigned id.

use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use super::{EntityStore, ListQuery, StoreError};
use crate::config;

pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
}

impl RestStore {
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config::REQUEST_TIMEOUT_SECS))
            .build()
            .expect("reqwest client with static configuration");
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Reads the base URL from `MEDIBOOK_API_URL`, falling back to the
    /// development default.
    pub fn from_env() -> Self {
        Self::new(&config::api_base_url())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/{}", self.base_url, collection)
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{}/{}", self.base_url, collection, id)
    }

    fn transport(err: reqwest::Error) -> StoreError {
        if err.is_timeout() {
            StoreError::Transport(format!("request timed out: {err}"))
        } else if err.is_connect() {
            StoreError::Transport(format!("connection failed: {err}"))
        } else {
            StoreError::Transport(err.to_string())
        }
    }

    /// 404 on an id-targeted request means the document is gone; anything
    /// else non-2xx is surfaced with the response body.
    async fn check(
        response: reqwest::Response,
        collection: &'static str,
        id: Option<&str>,
    ) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            if let Some(id) = id {
                return Err(StoreError::Missing {
                    collection,
                    id: id.to_string(),
                });
            }
        }
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn read_json(
        response: reqwest::Response,
        collection: &'static str,
    ) -> Result<Value, StoreError> {
        response
            .json::<Value>()
            .await
            .map_err(|e| StoreError::Decode {
                collection,
                reason: e.to_string(),
            })
    }
}

#[async_trait::async_trait]
impl EntityStore for RestStore {
    async fn list(
        &self,
        collection: &'static str,
        query: &ListQuery,
    ) -> Result<Vec<Value>, StoreError> {
        debug!(collection, filters = query.filters().len(), "listing documents");
        let response = self
            .client
            .get(self.collection_url(collection))
            .query(query.filters())
            .send()
            .await
            .map_err(Self::transport)?;
        let response = Self::check(response, collection, None).await?;
        match Self::read_json(response, collection).await? {
            Value::Array(docs) => Ok(docs),
            other => Err(StoreError::Decode {
                collection,
                reason: format!("expected an array, got {other}"),
            }),
        }
    }

    async fn get(&self, collection: &'static str, id: &str) -> Result<Value, StoreError> {
        let response = self
            .client
            .get(self.document_url(collection, id))
            .send()
            .await
            .map_err(Self::transport)?;
        let response = Self::check(response, collection, Some(id)).await?;
        Self::read_json(response, collection).await
    }

    async fn create(
        &self,
        collection: &'static str,
        document: Value,
    ) -> Result<Value, StoreError> {
        debug!(collection, "creating document");
        let response = self
            .client
            .post(self.collection_url(collection))
            .json(&document)
            .send()
            .await
            .map_err(Self::transport)?;
        let response = Self::check(response, collection, None).await?;
        Self::read_json(response, collection).await
    }

    async fn patch(
        &self,
        collection: &'static str,
        id: &str,
        changes: Value,
    ) -> Result<Value, StoreError> {
        let response = self
            .client
            .patch(self.document_url(collection, id))
            .json(&changes)
            .send()
            .await
            .map_err(Self::transport)?;
        let response = Self::check(response, collection, Some(id)).await?;
        Self::read_json(response, collection).await
    }

    async fn replace(
        &self,
        collection: &'static str,
        id: &str,
        document: Value,
    ) -> Result<Value, StoreError> {
        let response = self
            .client
            .put(self.document_url(collection, id))
            .json(&document)
            .send()
            .await
            .map_err(Self::transport)?;
        let response = Self::check(response, collection, Some(id)).await?;
        Self::read_json(response, collection).await
    }

    async fn delete(&self, collection: &'static str, id: &str) -> Result<(), StoreError> {
        let response = self
            .client
            .delete(self.document_url(collection, id))
            .send()
            .await
            .map_err(Self::transport)?;
        Self::check(response, collection, Some(id)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, RwLock};

    use axum::extract::{Path, Query, State};
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    type Db = Arc<RwLock<HashMap<String, Vec<Value>>>>;

    fn doc_matches(doc: &Value, params: &HashMap<String, String>) -> bool {
        params.iter().all(|(field, want)| match doc.get(field) {
            Some(Value::String(have)) => have == want,
            Some(Value::Null) | None => false,
            Some(other) => other.to_string() == *want,
        })
    }

    async fn list_docs(
        State(db): State<Db>,
        Path(collection): Path<String>,
        Query(params): Query<HashMap<String, String>>,
    ) -> Json<Value> {
        let db = db.read().unwrap();
        let matched: Vec<Value> = db
            .get(&collection)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|doc| doc_matches(doc, &params))
            .collect();
        Json(Value::Array(matched))
    }

    async fn create_doc(
        State(db): State<Db>,
        Path(collection): Path<String>,
        Json(mut doc): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        if doc.get("id").and_then(Value::as_str).map_or(true, str::is_empty) {
            if let Value::Object(fields) = &mut doc {
                fields.insert(
                    "id".into(),
                    Value::String(uuid::Uuid::new_v4().to_string()),
                );
            }
        }
        db.write()
            .unwrap()
            .entry(collection)
            .or_default()
            .push(doc.clone());
        (StatusCode::CREATED, Json(doc))
    }

    async fn get_doc(
        State(db): State<Db>,
        Path((collection, id)): Path<(String, String)>,
    ) -> Result<Json<Value>, StatusCode> {
        db.read()
            .unwrap()
            .get(&collection)
            .and_then(|docs| docs.iter().find(|d| d["id"] == id.as_str()).cloned())
            .map(Json)
            .ok_or(StatusCode::NOT_FOUND)
    }

    async fn patch_doc(
        State(db): State<Db>,
        Path((collection, id)): Path<(String, String)>,
        Json(changes): Json<Value>,
    ) -> Result<Json<Value>, StatusCode> {
        let mut db = db.write().unwrap();
        let doc = db
            .get_mut(&collection)
            .and_then(|docs| docs.iter_mut().find(|d| d["id"] == id.as_str()))
            .ok_or(StatusCode::NOT_FOUND)?;
        if let (Value::Object(fields), Value::Object(updates)) = (&mut *doc, changes) {
            for (key, value) in updates {
                fields.insert(key, value);
            }
        }
        Ok(Json(doc.clone()))
    }

    async fn put_doc(
        State(db): State<Db>,
        Path((collection, id)): Path<(String, String)>,
        Json(mut incoming): Json<Value>,
    ) -> Result<Json<Value>, StatusCode> {
        let mut db = db.write().unwrap();
        let doc = db
            .get_mut(&collection)
            .and_then(|docs| docs.iter_mut().find(|d| d["id"] == id.as_str()))
            .ok_or(StatusCode::NOT_FOUND)?;
        if let Value::Object(fields) = &mut incoming {
            fields.insert("id".into(), Value::String(id));
        }
        *doc = incoming.clone();
        Ok(Json(incoming))
    }

    async fn delete_doc(
        State(db): State<Db>,
        Path((collection, id)): Path<(String, String)>,
    ) -> StatusCode {
        let mut db = db.write().unwrap();
        let Some(docs) = db.get_mut(&collection) else {
            return StatusCode::NOT_FOUND;
        };
        let before = docs.len();
        docs.retain(|d| d["id"] != id.as_str());
        if docs.len() == before {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::OK
        }
    }

    async fn spawn_store() -> String {
        let db: Db = Db::default();
        let app = Router::new()
            .route("/:collection", get(list_docs).post(create_doc))
            .route(
                "/:collection/:id",
                get(get_doc)
                    .patch(patch_doc)
                    .put(put_doc)
                    .delete(delete_doc),
            )
            .with_state(db);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn trailing_slash_in_base_url_is_trimmed() {
        let store = RestStore::new("http://localhost:3000/");
        assert_eq!(store.base_url(), "http://localhost:3000");
    }

    #[tokio::test]
    async fn create_then_get_roundtrips_over_http() {
        let base = spawn_store().await;
        let store = RestStore::new(&base);

        let stored = store
            .create("appointments", json!({ "patientName": "Asha Rao" }))
            .await
            .unwrap();
        let id = stored["id"].as_str().unwrap();
        assert!(!id.is_empty());

        let fetched = store.get("appointments", id).await.unwrap();
        assert_eq!(fetched["patientName"], "Asha Rao");
    }

    #[tokio::test]
    async fn list_sends_filters_as_query_parameters() {
        let base = spawn_store().await;
        let store = RestStore::new(&base);

        for doctor in ["doc-1", "doc-1", "doc-2"] {
            store
                .create("appointments", json!({ "doctorId": doctor }))
                .await
                .unwrap();
        }

        let mine = store
            .list("appointments", &ListQuery::new().eq("doctorId", "doc-1"))
            .await
            .unwrap();
        assert_eq!(mine.len(), 2);

        let all = store.list("appointments", &ListQuery::new()).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn missing_document_maps_to_missing_error() {
        let base = spawn_store().await;
        let store = RestStore::new(&base);

        let err = store.get("appointments", "no-such-id").await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Missing { collection: "appointments", .. }
        ));
    }

    #[tokio::test]
    async fn patch_merges_and_put_replaces() {
        let base = spawn_store().await;
        let store = RestStore::new(&base);

        let stored = store
            .create("appointments", json!({ "status": "pending", "notes": "first" }))
            .await
            .unwrap();
        let id = stored["id"].as_str().unwrap().to_string();

        let patched = store
            .patch("appointments", &id, json!({ "status": "confirmed" }))
            .await
            .unwrap();
        assert_eq!(patched["status"], "confirmed");
        assert_eq!(patched["notes"], "first");

        let replaced = store
            .replace("appointments", &id, json!({ "status": "cancelled" }))
            .await
            .unwrap();
        assert_eq!(replaced["id"], id.as_str());
        assert_eq!(replaced["status"], "cancelled");
        assert!(replaced.get("notes").is_none());
    }

    #[tokio::test]
    async fn delete_removes_the_document() {
        let base = spawn_store().await;
        let store = RestStore::new(&base);

        let stored = store
            .create("reviews", json!({ "rating": 5 }))
            .await
            .unwrap();
        let id = stored["id"].as_str().unwrap().to_string();

        store.delete("reviews", &id).await.unwrap();
        assert!(matches!(
            store.get("reviews", &id).await,
            Err(StoreError::Missing { .. })
        ));
    }

    #[tokio::test]
    async fn unreachable_store_surfaces_as_transport_error() {
        // Bind then drop a listener so the port is known to refuse connections.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let store = RestStore::new(&format!("http://{addr}"));
        let err = store
            .list("appointments", &ListQuery::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Transport(_)));
    }
}
