use std::{env, net::SocketAddr, sync::Arc};

use axum::Router;
use common::utils::logging::init_logging_default;
use dotenvy::dotenv;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::routes::{self, ServerState};
use service::{file::collection_store::CollectionStore, runtime};

/// Initialize logging via shared common utils
fn init_logging() {
    init_logging_default();
}

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Load host/port from configs or env vars, with sensible fallbacks
fn load_bind_addr() -> anyhow::Result<SocketAddr> {
    let (host, port) = match configs::load_default() {
        Ok(cfg) => {
            let s = cfg.server;
            (s.host, s.port)
        }
        Err(_) => {
            let host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
            let port = env::var("SERVER_PORT")
                .ok()
                .and_then(|p| p.parse::<u16>().ok())
                .unwrap_or(3000);
            (host, port)
        }
    };
    Ok(format!("{}:{}", host, port).parse()?)
}

/// Snapshot file path from configs or env, defaulting next to the process.
fn load_store_path() -> String {
    match configs::load_default() {
        Ok(cfg) => cfg.storage.path,
        Err(_) => env::var("STORE_PATH").unwrap_or_else(|_| "data/db.json".to_string()),
    }
}

/// Public entry: build the app and run the HTTP server
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    init_logging();

    runtime::ensure_env("data").await?;

    // The single store instance for the process lifetime. A corrupt snapshot
    // refuses to start rather than silently serving an empty store.
    let store_path = load_store_path();
    let store = CollectionStore::new(store_path.as_str())
        .await
        .map_err(|e| anyhow::anyhow!("cannot open store {}: {}", store_path, e))?;

    let state = ServerState { store: Arc::clone(&store) };

    // Build router
    let cors = build_cors();
    let app: Router = routes::build_router(state, cors);

    // Bind and serve
    let addr = load_bind_addr()?;
    info!(%addr, store = %store_path, "starting document store server");
    println!("starting document store server at {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
