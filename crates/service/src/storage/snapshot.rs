use std::{collections::HashMap, path::Path};
use tokio::fs;

use crate::errors::ServiceError;

/// A single schema-less record. The store reserves the `id` field; everything
/// else is caller-supplied.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Full store state as persisted: collection name -> records in insertion order.
pub type Collections = HashMap<String, Vec<Document>>;

/// Read the whole snapshot file into memory.
///
/// A missing or empty file is an empty store. Content that exists but does not
/// parse is a corrupt store and must be surfaced, not papered over.
pub async fn load(path: &Path) -> Result<Collections, ServiceError> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "snapshot file missing; starting with an empty store");
            return Ok(Collections::new());
        }
        Err(e) => return Err(ServiceError::Io(e.to_string())),
    };
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(Collections::new());
    }
    serde_json::from_slice(&bytes)
        .map_err(|e| ServiceError::Corrupt(format!("{}: {}", path.display(), e)))
}

/// Serialize the full state and replace the snapshot file.
///
/// Writes a sibling temp file and renames it over the target, so readers never
/// observe a partially written snapshot.
pub async fn save(path: &Path, state: &Collections) -> Result<(), ServiceError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await.map_err(|e| ServiceError::Io(e.to_string()))?;
        }
    }
    let data = serde_json::to_vec(state).map_err(|e| ServiceError::Io(e.to_string()))?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, data).await.map_err(|e| ServiceError::Io(e.to_string()))?;
    fs::rename(&tmp, path).await.map_err(|e| ServiceError::Io(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(pairs: &[(&str, serde_json::Value)]) -> Document {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[tokio::test]
    async fn missing_file_loads_empty() -> Result<(), anyhow::Error> {
        let tmp = std::env::temp_dir().join(format!("snapshot_missing_{}.json", uuid::Uuid::new_v4()));
        let state = load(&tmp).await?;
        assert!(state.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn empty_file_loads_empty() -> Result<(), anyhow::Error> {
        let tmp = std::env::temp_dir().join(format!("snapshot_empty_{}.json", uuid::Uuid::new_v4()));
        tokio::fs::write(&tmp, b"").await?;
        let state = load(&tmp).await?;
        assert!(state.is_empty());
        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn corrupt_file_is_rejected() -> Result<(), anyhow::Error> {
        let tmp = std::env::temp_dir().join(format!("snapshot_corrupt_{}.json", uuid::Uuid::new_v4()));
        tokio::fs::write(&tmp, b"{ not json").await?;
        let err = load(&tmp).await.unwrap_err();
        assert!(matches!(err, ServiceError::Corrupt(_)));
        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn round_trip_preserves_record_order() -> Result<(), anyhow::Error> {
        let tmp = std::env::temp_dir().join(format!("snapshot_rt_{}.json", uuid::Uuid::new_v4()));
        let mut state = Collections::new();
        state.insert(
            "items".into(),
            vec![
                doc(&[("id", json!(3)), ("name", json!("c"))]),
                doc(&[("id", json!(1)), ("name", json!("a"))]),
                doc(&[("id", json!(2)), ("name", json!("b"))]),
            ],
        );
        save(&tmp, &state).await?;

        let reloaded = load(&tmp).await?;
        let items = reloaded.get("items").expect("collection present");
        let ids: Vec<i64> = items.iter().map(|d| d["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![3, 1, 2]);
        assert_eq!(items[1]["name"], json!("a"));

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }
}
