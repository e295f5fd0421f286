use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use tracing::info;

use service::storage::snapshot::Document;

use crate::errors::JsonApiError;
use crate::routes::ServerState;

/// Ids are numeric; a non-numeric path segment matches no record.
fn parse_id(raw: &str) -> Result<i64, JsonApiError> {
    raw.parse::<i64>().map_err(|_| JsonApiError::not_found())
}

fn object_body(body: Value) -> Result<Document, JsonApiError> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(JsonApiError::new(
            StatusCode::BAD_REQUEST,
            "request body must be a JSON object",
            None,
        )),
    }
}

#[utoipa::path(
    get, path = "/{collection}", tag = "collections",
    params(("collection" = String, Path, description = "Collection name")),
    responses((status = 200, description = "All records of the collection"))
)]
pub async fn list(
    State(state): State<ServerState>,
    Path(collection): Path<String>,
) -> Json<Vec<Document>> {
    let items = state.store.list(&collection).await;
    info!(collection = %collection, count = items.len(), "list documents");
    Json(items)
}

#[utoipa::path(
    get, path = "/{collection}/{id}", tag = "collections",
    params(
        ("collection" = String, Path, description = "Collection name"),
        ("id" = String, Path, description = "Numeric record id")
    ),
    responses(
        (status = 200, description = "Record found"),
        (status = 404, description = "No record with that id")
    )
)]
pub async fn get_one(
    State(state): State<ServerState>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<Document>, JsonApiError> {
    let id = parse_id(&id)?;
    let found = state.store.get(&collection, id).await?;
    Ok(Json(found))
}

#[utoipa::path(
    post, path = "/{collection}", tag = "collections",
    params(("collection" = String, Path, description = "Collection name")),
    request_body = crate::openapi::DocumentDoc,
    responses(
        (status = 201, description = "Record created with a server-assigned id"),
        (status = 400, description = "Body is not a JSON object"),
        (status = 500, description = "Persistence failure")
    )
)]
pub async fn create(
    State(state): State<ServerState>,
    Path(collection): Path<String>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Document>), JsonApiError> {
    let fields = object_body(body)?;
    let created = state.store.insert(&collection, fields).await?;
    info!(collection = %collection, id = created["id"].as_i64(), "created document");
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    put, path = "/{collection}/{id}", tag = "collections",
    params(
        ("collection" = String, Path, description = "Collection name"),
        ("id" = String, Path, description = "Numeric record id")
    ),
    request_body = crate::openapi::DocumentDoc,
    responses(
        (status = 200, description = "Merged record"),
        (status = 400, description = "Body is not a JSON object"),
        (status = 404, description = "No record with that id"),
        (status = 500, description = "Persistence failure")
    )
)]
pub async fn update(
    State(state): State<ServerState>,
    Path((collection, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<Json<Document>, JsonApiError> {
    let id = parse_id(&id)?;
    let patch = object_body(body)?;
    let updated = state.store.update(&collection, id, patch).await?;
    info!(collection = %collection, id, "updated document");
    Ok(Json(updated))
}

#[utoipa::path(
    delete, path = "/{collection}/{id}", tag = "collections",
    params(
        ("collection" = String, Path, description = "Collection name"),
        ("id" = String, Path, description = "Numeric record id")
    ),
    responses(
        (status = 200, description = "Record deleted"),
        (status = 404, description = "No record with that id"),
        (status = 500, description = "Persistence failure")
    )
)]
pub async fn delete_one(
    State(state): State<ServerState>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<Value>, JsonApiError> {
    let id = parse_id(&id)?;
    state.store.delete(&collection, id).await?;
    info!(collection = %collection, id, "deleted document");
    Ok(Json(serde_json::json!({"message": "item deleted"})))
}
