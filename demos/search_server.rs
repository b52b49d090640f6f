//! Minimal HTTP search server on top of the tracker
//!
//! Run with a local Redis:
//!
//! ```sh
//! REDIS_URL=redis://127.0.0.1/ cargo run --example search_server
//! ```
//!
//! Endpoints:
//! - `GET /search?q=bit&limit=5` — prefix search over the coin index
//! - `GET /coins/bitcoin` — one coin's cached market record
//! - `GET /metrics` — tracker health snapshot

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use coin_tracker_sdk::{
    CoinGeckoProvider, CoinTracker, NoopSnapshotStore, RedisStore, SearchError,
};

#[derive(Deserialize)]
struct SearchParams {
    q: Option<String>,
    limit: Option<usize>,
}

async fn search(
    State(tracker): State<Arc<CoinTracker>>,
    Query(params): Query<SearchParams>,
) -> Response {
    let query = params.q.unwrap_or_default();
    let result = match params.limit {
        Some(limit) => tracker.search_with_limit(&query, limit).await,
        None => tracker.search(&query).await,
    };

    match result {
        Ok(response) => Json(response).into_response(),
        Err(SearchError::EmptyQuery) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "query parameter q is required" })),
        )
            .into_response(),
    }
}

async fn coin(State(tracker): State<Arc<CoinTracker>>, Path(id): Path<String>) -> Response {
    match tracker.coin(&id).await {
        Ok(Some(record)) => Json(record).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("coin {id} is not cached") })),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

async fn metrics(State(tracker): State<Arc<CoinTracker>>) -> Response {
    Json(tracker.metrics().await).into_response()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let redis_url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".to_string());
    let store = Arc::new(RedisStore::connect(&redis_url).await?);

    let tracker = Arc::new(CoinTracker::new(
        store,
        Arc::new(NoopSnapshotStore),
        Arc::new(CoinGeckoProvider::new()?),
    ));
    tracker.start();

    let app = Router::new()
        .route("/search", get(search))
        .route("/coins/{id}", get(coin))
        .route("/metrics", get(metrics))
        .with_state(tracker);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
    info!(addr = %listener.local_addr()?, "search server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
