use crate::errors::ServiceError;
use crate::storage::snapshot::Document;

/// CRUD surface of the document store, as seen by the HTTP layer.
#[async_trait::async_trait]
pub trait DocStore: Send + Sync {
    async fn ensure_collection(&self, name: &str);
    async fn list(&self, name: &str) -> Vec<Document>;
    async fn get(&self, name: &str, id: i64) -> Result<Document, ServiceError>;
    async fn insert(&self, name: &str, fields: Document) -> Result<Document, ServiceError>;
    async fn update(&self, name: &str, id: i64, patch: Document) -> Result<Document, ServiceError>;
    async fn delete(&self, name: &str, id: i64) -> Result<(), ServiceError>;
}
