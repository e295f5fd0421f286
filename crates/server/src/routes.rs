pub mod collections;

use std::sync::Arc;

use axum::{routing::get, Json, Router};
use tower_http::{
    cors::CorsLayer,
    trace::{TraceLayer, DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, DefaultOnFailure},
};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use common::types::Health;
use service::file::collection_store::CollectionStore;

/// Shared state handed to every handler: the single store instance owned by
/// the process.
#[derive(Clone)]
pub struct ServerState {
    pub store: Arc<CollectionStore>,
}

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "OK")))]
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// Build the full application router: health, collection CRUD, and docs.
pub fn build_router(state: ServerState, cors: CorsLayer) -> Router {
    let docs = SwaggerUi::new("/docs")
        .url("/api-docs/openapi.json", crate::openapi::ApiDoc::openapi());

    // Collection names are free-form path segments; static routes registered
    // here take priority over them.
    let api = Router::new()
        .route("/health", get(health))
        .route(
            "/:collection",
            get(collections::list).post(collections::create),
        )
        .route(
            "/:collection/:id",
            get(collections::get_one)
                .put(collections::update)
                .delete(collections::delete_one),
        )
        .with_state(state);

    Router::new()
        .merge(docs)
        .merge(api)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(
                    DefaultMakeSpan::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_request(
                    DefaultOnRequest::new()
                        .level(Level::INFO),
                )
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_failure(
                    DefaultOnFailure::new()
                        .level(Level::ERROR),
                )
        )
}
