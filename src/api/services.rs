use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use std::collections::HashMap;

use super::{
    error::ApiError,
    models::{ChargesQuery, DocketRequest, HealthResponse, ProcessRequest, TriggerRemoved},
    state::AppState,
    utils::{read_json, read_optional_json},
    validation::{PayloadValidationError, validate_case, validate_items, validate_trigger},
};
use crate::triggers::{DiscoveredItem, Trigger};

const DEFAULT_CHARGES_LIMIT: usize = 50;
const MAX_CHARGES_LIMIT: usize = 1000;

fn invalid(err: PayloadValidationError) -> ApiError {
    ApiError::InvalidPayload(err.to_string())
}

/// POST /api/items/evaluate
///
/// Runs a JSON array of discovered items through the triggers and queues
/// every match that names a document. Gzip bodies are decompressed by the
/// middleware before they get here.
pub async fn evaluate_items(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    let items: Vec<DiscoveredItem> = read_json(&headers, body, state.max_payload).await?;
    validate_items(&items).map_err(invalid)?;

    let report = state.service.evaluate_batch(&items)?;
    Ok((StatusCode::OK, Json(report)))
}

/// POST /api/queue/process
///
/// Body is optional; `max_count` defaults to the configured batch size.
pub async fn process_queue(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    let request: ProcessRequest = read_optional_json(&headers, body, state.max_payload).await?;
    let max_count = request
        .max_count
        .unwrap_or(state.service.context().config.discovery.batch_size);
    if max_count == 0 {
        return Err(ApiError::InvalidPayload("max_count must be positive".into()));
    }

    let report = state.service.process_batch(max_count).await?;
    Ok((StatusCode::OK, Json(report)))
}

/// GET /api/status
pub async fn status(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok((StatusCode::OK, Json(state.service.get_status()?)))
}

/// GET /api/charges?limit=n, newest first
pub async fn charges(
    State(state): State<AppState>,
    Query(query): Query<ChargesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_CHARGES_LIMIT).min(MAX_CHARGES_LIMIT);
    Ok((StatusCode::OK, Json(state.service.recent_charges(limit)?)))
}

/// POST /api/dockets
pub async fn fetch_docket(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    let request: DocketRequest = read_json(&headers, body, state.max_payload).await?;
    validate_case(&request.court, &request.case_number).map_err(invalid)?;

    let sheet = state
        .service
        .fetch_docket(&request.court, &request.case_number)
        .await?;
    Ok((StatusCode::OK, Json(sheet)))
}

/// GET /api/triggers
pub async fn list_triggers(State(state): State<AppState>) -> impl IntoResponse {
    let triggers: Vec<Trigger> = state.service.context().engine().triggers().to_vec();
    Json(triggers)
}

/// POST /api/triggers, replacing any trigger of the same name
pub async fn add_trigger(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    let trigger: Trigger = read_json(&headers, body, state.max_payload).await?;
    validate_trigger(&trigger).map_err(invalid)?;

    state.service.add_trigger(trigger.clone());
    Ok((StatusCode::CREATED, Json(trigger)))
}

/// DELETE /api/triggers/{name}
pub async fn remove_trigger(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.service.remove_trigger(&name) {
        return Err(ApiError::NotFound(format!("trigger {name}")));
    }
    Ok((StatusCode::OK, Json(TriggerRemoved { name, removed: true })))
}

/// GET /health
///
/// 503 when the ledger cannot be read.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let mut components = HashMap::new();
    components.insert("api".to_string(), "healthy".to_string());

    let ledger = match state.service.context().ledger.check_limits() {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };
    components.insert("ledger".to_string(), ledger.to_string());

    let auth = if state.service.context().authenticator.is_configured() {
        "configured"
    } else {
        "unconfigured"
    };
    components.insert("auth".to_string(), auth.to_string());

    let all_healthy = ledger == "healthy";
    let status_code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: if all_healthy { "healthy" } else { "unhealthy" }.to_string(),
        components,
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (status_code, Json(response))
}
