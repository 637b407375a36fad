use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub service: String,
}

impl HealthStatus {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            service: "dbgate".to_string(),
        }
    }
}

/// Liveness only: does not touch any backend.
pub async fn health_handler() -> Json<HealthStatus> {
    Json(HealthStatus::healthy())
}
