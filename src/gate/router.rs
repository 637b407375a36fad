use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::backend::QueryResponse;
use crate::error::GateError;
use crate::gate::{Gate, API_KEY_HEADER};
use crate::proxy::health::health_handler;
use crate::proxy::json_body;
use crate::proxy::types::{ModeRequest, ModeResponse, QueryRequest};
use crate::routing::StatsReport;

pub fn build_router(gate: Gate) -> Router {
    Router::new()
        .route("/gatekeeper", post(query_handler))
        .route("/query", post(query_handler))
        .route("/set_mode", post(set_mode_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .with_state(gate)
}

fn api_key(headers: &HeaderMap) -> Option<&str> {
    headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok())
}

/// A body that is not valid JSON counts as a missing field, so the
/// credential is always checked first.
async fn query_handler(
    State(gate): State<Gate>,
    headers: HeaderMap,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, GateError> {
    let request = json_body(body).unwrap_or_default();
    gate.handle(api_key(&headers), request.query.as_deref())
        .await
        .map(Json)
}

async fn set_mode_handler(
    State(gate): State<Gate>,
    headers: HeaderMap,
    body: Result<Json<ModeRequest>, JsonRejection>,
) -> Result<Json<ModeResponse>, GateError> {
    let key = api_key(&headers);
    let request = json_body(body).unwrap_or_default();
    let mode = gate.set_mode(key, request.mode.as_deref()).await?;
    Ok(Json(ModeResponse::updated(mode)))
}

async fn stats_handler(
    State(gate): State<Gate>,
    headers: HeaderMap,
) -> Result<Json<StatsReport>, GateError> {
    gate.get_stats(api_key(&headers)).await.map(Json)
}
