//! Abstract document store.
//!
//! The kernel talks to its backing store through [`DocumentStore`], an async
//! key/value and query interface. Tenant isolation is enforced entirely by
//! path-prefixing collection paths with the tenant id; the kernel never
//! issues a query without a tenant scope.
//!
//! [`MemoryStore`] is the bundled implementation, used by the dev server and
//! the test suite. It can be seeded from a JSON fixture file.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::models::SortDirection;

/// A stored document: its id plus its JSON data.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

/// A collection query: equality filters, a single-field sort, and a limit.
#[derive(Debug, Clone, Default)]
pub struct CollectionQuery {
    /// Field path (dotted) equality filters, applied conjunctively.
    pub equality_filters: Vec<(String, Value)>,

    /// Optional single-field ordering. Documents missing the field are
    /// excluded from ordered results, matching the original store's
    /// semantics.
    pub order_by: Option<(String, SortDirection)>,

    /// Maximum number of documents to return.
    pub limit: Option<usize>,
}

impl CollectionQuery {
    /// Add an equality filter.
    pub fn filter(mut self, field: impl Into<String>, value: Value) -> Self {
        self.equality_filters.push((field.into(), value));
        self
    }

    /// Set the ordering.
    pub fn order(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    /// Set the limit.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Async document store interface.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a single document, or `None` if absent.
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Value>>;

    /// Query a collection with equality filters, single-field sort and limit.
    async fn query_collection(
        &self,
        collection: &str,
        query: &CollectionQuery,
    ) -> Result<Vec<Document>>;

    /// Create or replace a document. With `merge`, top-level fields are
    /// shallow-merged into the existing document instead of replacing it.
    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        data: Value,
        merge: bool,
    ) -> Result<()>;

    /// Add a document with a generated id; returns the id.
    async fn add_document(&self, collection: &str, data: Value) -> Result<String>;

    /// Delete a document. Deleting an absent document is not an error.
    async fn delete_document(&self, collection: &str, id: &str) -> Result<()>;
}

/// In-memory document store backed by per-collection maps.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: DashMap<String, BTreeMap<String, Value>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a seed value of shape
    /// `{ "collection/path": { "doc-id": { ... } } }`.
    pub fn from_seed_value(seed: &Value) -> Result<Self> {
        let store = Self::new();
        let collections = seed
            .as_object()
            .context("seed root must be a JSON object keyed by collection path")?;

        for (path, docs) in collections {
            let docs = docs
                .as_object()
                .with_context(|| format!("seed collection '{path}' must be an object"))?;
            let mut map = BTreeMap::new();
            for (id, data) in docs {
                map.insert(id.clone(), data.clone());
            }
            store.collections.insert(path.clone(), map);
        }

        Ok(store)
    }

    /// Load a seed fixture from disk.
    pub fn from_seed_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read seed file {}", path.display()))?;
        let seed: Value = serde_json::from_str(&raw)
            .with_context(|| format!("seed file {} is not valid JSON", path.display()))?;
        let store = Self::from_seed_value(&seed)?;
        debug!(path = %path.display(), "seed fixture loaded");
        Ok(store)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        Ok(self
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id).cloned()))
    }

    async fn query_collection(
        &self,
        collection: &str,
        query: &CollectionQuery,
    ) -> Result<Vec<Document>> {
        let Some(docs) = self.collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut matched: Vec<Document> = docs
            .iter()
            .filter(|(_, data)| {
                query
                    .equality_filters
                    .iter()
                    .all(|(field, expected)| lookup_path(data, field) == Some(expected))
            })
            .map(|(id, data)| Document {
                id: id.clone(),
                data: data.clone(),
            })
            .collect();
        drop(docs);

        if let Some((field, direction)) = &query.order_by {
            matched.retain(|doc| lookup_path(&doc.data, field).is_some());
            matched.sort_by(|a, b| {
                let ordering = match (lookup_path(&a.data, field), lookup_path(&b.data, field)) {
                    (Some(x), Some(y)) => compare_values(x, y),
                    _ => Ordering::Equal,
                };
                match direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        if let Some(limit) = query.limit {
            matched.truncate(limit);
        }

        Ok(matched)
    }

    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        data: Value,
        merge: bool,
    ) -> Result<()> {
        let mut docs = self.collections.entry(collection.to_string()).or_default();

        if merge
            && let Value::Object(incoming) = &data
            && let Some(Value::Object(existing)) = docs.get_mut(id)
        {
            for (key, value) in incoming {
                existing.insert(key.clone(), value.clone());
            }
            return Ok(());
        }

        docs.insert(id.to_string(), data);
        Ok(())
    }

    async fn add_document(&self, collection: &str, data: Value) -> Result<String> {
        let id = Uuid::now_v7().to_string();
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), data);
        Ok(id)
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<()> {
        if let Some(mut docs) = self.collections.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }
}

/// Resolve a dotted field path (e.g. `nav.order`) inside a JSON value.
fn lookup_path<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = data;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

/// Total ordering over JSON field values for sorting.
///
/// Numbers compare numerically, strings and booleans natively; mixed types
/// compare by a fixed type rank so sorting stays stable.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        let docs = [
            ("a", json!({ "status": "published", "price": 300, "createdAt": "2026-01-03T00:00:00Z" })),
            ("b", json!({ "status": "published", "price": 100, "createdAt": "2026-01-01T00:00:00Z" })),
            ("c", json!({ "status": "draft", "price": 200, "createdAt": "2026-01-02T00:00:00Z" })),
        ];
        let mut map = BTreeMap::new();
        for (id, data) in docs {
            map.insert(id.to_string(), data);
        }
        store.collections.insert("clients/acme/content/listings".to_string(), map);
        store
    }

    #[tokio::test]
    async fn get_document_returns_none_for_missing() {
        let store = MemoryStore::new();
        let doc = store.get_document("clients/acme/pages", "home").await.unwrap();
        assert!(doc.is_none());
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let store = MemoryStore::new();
        store
            .set_document("clients/acme/pages", "home", json!({ "status": "published" }), false)
            .await
            .unwrap();
        let doc = store.get_document("clients/acme/pages", "home").await.unwrap().unwrap();
        assert_eq!(doc["status"], "published");
    }

    #[tokio::test]
    async fn merge_preserves_existing_fields() {
        let store = MemoryStore::new();
        store
            .set_document("clients/acme/settings", "public", json!({ "name": "Acme", "phone": "123" }), false)
            .await
            .unwrap();
        store
            .set_document("clients/acme/settings", "public", json!({ "phone": "456" }), true)
            .await
            .unwrap();

        let doc = store.get_document("clients/acme/settings", "public").await.unwrap().unwrap();
        assert_eq!(doc["name"], "Acme");
        assert_eq!(doc["phone"], "456");
    }

    #[tokio::test]
    async fn query_applies_filters_sort_and_limit() {
        let store = seeded_store();
        let query = CollectionQuery::default()
            .filter("status", json!("published"))
            .order("price", SortDirection::Asc)
            .limit(10);

        let docs = store
            .query_collection("clients/acme/content/listings", &query)
            .await
            .unwrap();

        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn query_sorts_descending_by_timestamp_string() {
        let store = seeded_store();
        let query = CollectionQuery::default().order("createdAt", SortDirection::Desc);
        let docs = store
            .query_collection("clients/acme/content/listings", &query)
            .await
            .unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
    }

    #[tokio::test]
    async fn query_limit_truncates() {
        let store = seeded_store();
        let query = CollectionQuery::default()
            .order("price", SortDirection::Desc)
            .limit(1);
        let docs = store
            .query_collection("clients/acme/content/listings", &query)
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "a");
    }

    #[tokio::test]
    async fn dotted_path_filter() {
        let store = MemoryStore::new();
        store
            .set_document("clients/acme/pages", "home", json!({ "nav": { "order": 1 } }), false)
            .await
            .unwrap();
        let query = CollectionQuery::default().filter("nav.order", json!(1));
        let docs = store.query_collection("clients/acme/pages", &query).await.unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[tokio::test]
    async fn add_document_generates_unique_ids() {
        let store = MemoryStore::new();
        let a = store.add_document("clients/acme/leads", json!({ "n": 1 })).await.unwrap();
        let b = store.add_document("clients/acme/leads", json!({ "n": 2 })).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn delete_document_is_idempotent() {
        let store = MemoryStore::new();
        store
            .set_document("clients/acme/pages", "home", json!({}), false)
            .await
            .unwrap();
        store.delete_document("clients/acme/pages", "home").await.unwrap();
        store.delete_document("clients/acme/pages", "home").await.unwrap();
        assert!(store.get_document("clients/acme/pages", "home").await.unwrap().is_none());
    }

    #[test]
    fn seed_value_builds_collections() {
        let seed = json!({
            "clients/acme/pages": {
                "home": { "status": "published" }
            }
        });
        let store = MemoryStore::from_seed_value(&seed).unwrap();
        let docs = store.collections.get("clients/acme/pages").unwrap();
        assert!(docs.contains_key("home"));
    }

    #[test]
    fn seed_value_rejects_non_object_root() {
        let seed = json!([1, 2, 3]);
        assert!(MemoryStore::from_seed_value(&seed).is_err());
    }
}
