use std::{path::PathBuf, sync::Arc};

use chrono::Utc;
use tokio::sync::RwLock;

use crate::collections::doc_store::DocStore;
use crate::errors::ServiceError;
use crate::storage::snapshot::{self, Collections, Document};

struct StoreInner {
    collections: Collections,
    // High-water mark of every id ever issued or loaded.
    last_id: i64,
}

impl StoreInner {
    fn next_id(&mut self) -> i64 {
        let now = Utc::now().timestamp_millis();
        self.last_id = now.max(self.last_id + 1);
        self.last_id
    }
}

fn record_id(record: &Document) -> Option<i64> {
    record.get("id").and_then(serde_json::Value::as_i64)
}

/// File-backed store of schema-less collections.
///
/// Collections are created the first time any operation names them. Every
/// mutation is applied to a copy of the state, the copy is persisted, and only
/// then does it replace the live state; the write lock is held across the
/// whole sequence, so at most one mutation is in flight and a failed write
/// leaves memory at its last durable value.
#[derive(Clone)]
pub struct CollectionStore {
    inner: Arc<RwLock<StoreInner>>,
    file_path: PathBuf,
}

impl CollectionStore {
    /// Initialize the store from the given snapshot path. A missing file is an
    /// empty store; an unparseable one is an error the caller must not ignore.
    pub async fn new<P: Into<PathBuf>>(path: P) -> Result<Arc<Self>, ServiceError> {
        let file_path = path.into();
        let collections = snapshot::load(&file_path).await?;
        let last_id = collections
            .values()
            .flatten()
            .filter_map(record_id)
            .max()
            .unwrap_or(0);
        let inner = StoreInner { collections, last_id };
        Ok(Arc::new(Self { inner: Arc::new(RwLock::new(inner)), file_path }))
    }

    /// Materialize the collection as an empty sequence if it does not exist
    /// yet. Idempotent, memory-only; the next mutation persists it.
    pub async fn ensure_collection(&self, name: &str) {
        {
            let inner = self.inner.read().await;
            if inner.collections.contains_key(name) {
                return;
            }
        }
        let mut inner = self.inner.write().await;
        inner.collections.entry(name.to_string()).or_default();
    }

    /// All records of a collection in insertion order.
    pub async fn list(&self, name: &str) -> Vec<Document> {
        self.ensure_collection(name).await;
        let inner = self.inner.read().await;
        inner.collections.get(name).cloned().unwrap_or_default()
    }

    /// First record whose `id` equals the given one.
    pub async fn get(&self, name: &str, id: i64) -> Result<Document, ServiceError> {
        self.ensure_collection(name).await;
        let inner = self.inner.read().await;
        inner
            .collections
            .get(name)
            .and_then(|records| records.iter().find(|r| record_id(r) == Some(id)))
            .cloned()
            .ok_or_else(|| ServiceError::not_found("item"))
    }

    /// Append a new record built from `fields` under a fresh id and persist.
    /// A caller-supplied `id` field is discarded; the store owns identity.
    pub async fn insert(&self, name: &str, mut fields: Document) -> Result<Document, ServiceError> {
        let mut inner = self.inner.write().await;
        inner.collections.entry(name.to_string()).or_default();

        let id = inner.next_id();
        fields.remove("id");
        let mut record = Document::new();
        record.insert("id".to_string(), serde_json::Value::from(id));
        record.append(&mut fields);

        let mut next = inner.collections.clone();
        next.entry(name.to_string()).or_default().push(record.clone());
        snapshot::save(&self.file_path, &next).await?;
        inner.collections = next;
        tracing::debug!(collection = %name, id, "inserted document");
        Ok(record)
    }

    /// Merge `patch` over the record with the given id and persist. Fields in
    /// the patch overwrite, unmentioned fields survive, and `id` never changes.
    pub async fn update(&self, name: &str, id: i64, mut patch: Document) -> Result<Document, ServiceError> {
        let mut inner = self.inner.write().await;
        inner.collections.entry(name.to_string()).or_default();

        let mut next = inner.collections.clone();
        let record = next
            .get_mut(name)
            .and_then(|records| records.iter_mut().find(|r| record_id(r) == Some(id)))
            .ok_or_else(|| ServiceError::not_found("item"))?;
        patch.remove("id");
        for (field, value) in patch {
            record.insert(field, value);
        }
        let updated = record.clone();

        snapshot::save(&self.file_path, &next).await?;
        inner.collections = next;
        tracing::debug!(collection = %name, id, "updated document");
        Ok(updated)
    }

    /// Remove the record with the given id and persist. Later records shift
    /// down one position.
    pub async fn delete(&self, name: &str, id: i64) -> Result<(), ServiceError> {
        let mut inner = self.inner.write().await;
        inner.collections.entry(name.to_string()).or_default();

        let mut next = inner.collections.clone();
        let records = next.entry(name.to_string()).or_default();
        let index = records
            .iter()
            .position(|r| record_id(r) == Some(id))
            .ok_or_else(|| ServiceError::not_found("item"))?;
        records.remove(index);

        snapshot::save(&self.file_path, &next).await?;
        inner.collections = next;
        tracing::debug!(collection = %name, id, "deleted document");
        Ok(())
    }
}

#[async_trait::async_trait]
impl DocStore for CollectionStore {
    async fn ensure_collection(&self, name: &str) { self.ensure_collection(name).await }
    async fn list(&self, name: &str) -> Vec<Document> { self.list(name).await }
    async fn get(&self, name: &str, id: i64) -> Result<Document, ServiceError> { self.get(name, id).await }
    async fn insert(&self, name: &str, fields: Document) -> Result<Document, ServiceError> { self.insert(name, fields).await }
    async fn update(&self, name: &str, id: i64, patch: Document) -> Result<Document, ServiceError> { self.update(name, id, patch).await }
    async fn delete(&self, name: &str, id: i64) -> Result<(), ServiceError> { self.delete(name, id).await }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use uuid::Uuid;

    fn tmp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("collection_store_{}_{}.json", tag, Uuid::new_v4()))
    }

    fn fields(pairs: &[(&str, Value)]) -> Document {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[tokio::test]
    async fn untouched_collection_lists_empty() -> Result<(), anyhow::Error> {
        let tmp = tmp_path("empty");
        let store = CollectionStore::new(&tmp).await?;
        assert!(store.list("never-seen").await.is_empty());
        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn insert_then_get_round_trips() -> Result<(), anyhow::Error> {
        let tmp = tmp_path("insert");
        let store = CollectionStore::new(&tmp).await?;

        let created = store.insert("items", fields(&[("name", json!("widget"))])).await?;
        let id = created["id"].as_i64().expect("numeric id");
        assert_eq!(created["name"], json!("widget"));

        let found = store.get("items", id).await?;
        assert_eq!(found, created);
        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn caller_supplied_id_is_discarded() -> Result<(), anyhow::Error> {
        let tmp = tmp_path("owned_id");
        let store = CollectionStore::new(&tmp).await?;

        let created = store.insert("items", fields(&[("id", json!(7)), ("name", json!("x"))])).await?;
        assert_ne!(created["id"], json!(7));
        assert_eq!(created["name"], json!("x"));
        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn rapid_inserts_never_collide() -> Result<(), anyhow::Error> {
        let tmp = tmp_path("rapid");
        let store = CollectionStore::new(&tmp).await?;

        let mut ids = Vec::new();
        for i in 0..100 {
            let created = store.insert("items", fields(&[("n", json!(i))])).await?;
            ids.push(created["id"].as_i64().unwrap());
        }
        let mut deduped = ids.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(ids.len(), deduped.len());
        // ids are monotonically increasing in insertion order
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn update_merges_fields_and_keeps_id() -> Result<(), anyhow::Error> {
        let tmp = tmp_path("update");
        let store = CollectionStore::new(&tmp).await?;

        let created = store
            .insert("items", fields(&[("name", json!("widget")), ("color", json!("red"))]))
            .await?;
        let id = created["id"].as_i64().unwrap();

        let updated = store
            .update("items", id, fields(&[("name", json!("gadget")), ("id", json!(999))]))
            .await?;
        assert_eq!(updated["name"], json!("gadget"));
        assert_eq!(updated["color"], json!("red"));
        assert_eq!(updated["id"], json!(id));

        let found = store.get("items", id).await?;
        assert_eq!(found, updated);

        assert!(matches!(
            store.update("items", id + 1, fields(&[("name", json!("nope"))])).await,
            Err(ServiceError::NotFound(_))
        ));
        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn delete_removes_and_get_fails() -> Result<(), anyhow::Error> {
        let tmp = tmp_path("delete");
        let store = CollectionStore::new(&tmp).await?;

        let a = store.insert("items", fields(&[("n", json!(1))])).await?;
        let b = store.insert("items", fields(&[("n", json!(2))])).await?;
        let a_id = a["id"].as_i64().unwrap();
        let b_id = b["id"].as_i64().unwrap();

        store.delete("items", a_id).await?;
        assert!(matches!(store.get("items", a_id).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(store.delete("items", a_id).await, Err(ServiceError::NotFound(_))));

        let remaining = store.list("items").await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0]["id"], json!(b_id));
        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn reload_preserves_records_and_order() -> Result<(), anyhow::Error> {
        let tmp = tmp_path("reload");
        let store = CollectionStore::new(&tmp).await?;

        let first = store.insert("items", fields(&[("name", json!("a"))])).await?;
        let second = store.insert("items", fields(&[("name", json!("b"))])).await?;
        store.insert("tools", fields(&[("name", json!("hammer"))])).await?;

        let reloaded = CollectionStore::new(&tmp).await?;
        let items = reloaded.list("items").await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], first);
        assert_eq!(items[1], second);
        assert_eq!(reloaded.list("tools").await.len(), 1);

        // new ids issued after a reload stay unique and increasing
        let third = reloaded.insert("items", fields(&[("name", json!("c"))])).await?;
        assert!(third["id"].as_i64().unwrap() > second["id"].as_i64().unwrap());
        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn corrupt_snapshot_refuses_to_open() -> Result<(), anyhow::Error> {
        let tmp = tmp_path("corrupt");
        tokio::fs::write(&tmp, b"]]not json[[").await?;
        assert!(matches!(CollectionStore::new(&tmp).await, Err(ServiceError::Corrupt(_))));
        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }
}
