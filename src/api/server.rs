use axum::{
    Router,
    routing::{delete, get, post},
};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::decompression::RequestDecompressionLayer;

use super::{
    services::{
        add_trigger, charges, evaluate_items, fetch_docket, health, list_triggers, process_queue,
        remove_trigger, status,
    },
    state::AppState,
};

/// Requests handled at once; purchases are serialized further down anyway.
const MAX_CONCURRENT_REQUESTS: usize = 64;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/items/evaluate", post(evaluate_items))
        .route("/api/queue/process", post(process_queue))
        .route("/api/status", get(status))
        .route("/api/charges", get(charges))
        .route("/api/dockets", post(fetch_docket))
        .route("/api/triggers", get(list_triggers).post(add_trigger))
        .route("/api/triggers/{name}", delete(remove_trigger))
        .route("/health", get(health))
        .with_state(state)
        // Gzip request bodies are decompressed before the handlers read them
        .layer(RequestDecompressionLayer::new())
        .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS))
}
