//! HTTP surface of the internal routing proxy.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::backend::QueryResponse;
use crate::error::GateError;
use crate::proxy::health::health_handler;
use crate::proxy::service::ProxyService;
use crate::proxy::types::{ModeRequest, ModeResponse, QueryRequest};
use crate::routing::StatsReport;

pub fn build_router(service: ProxyService) -> Router {
    Router::new()
        .route("/query", post(query_handler))
        .route("/set_mode", post(set_mode_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .with_state(service)
}

/// Turn a malformed JSON body into our own `BadRequest` document.
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, GateError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| GateError::BadRequest(rejection.body_text()))
}

async fn query_handler(
    State(service): State<ProxyService>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, GateError> {
    let request = json_body(body)?;
    let query = request.query.unwrap_or_default();
    service.query(&query).await.map(Json)
}

async fn set_mode_handler(
    State(service): State<ProxyService>,
    body: Result<Json<ModeRequest>, JsonRejection>,
) -> Result<Json<ModeResponse>, GateError> {
    let request = json_body(body)?;
    let mode = request.mode.unwrap_or_default();
    let mode = service.set_mode(&mode)?;
    Ok(Json(ModeResponse::updated(mode)))
}

async fn stats_handler(State(service): State<ProxyService>) -> Json<StatsReport> {
    Json(service.take_stats())
}
