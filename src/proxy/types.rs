//! JSON bodies exchanged with the proxy and the gate.

use serde::{Deserialize, Serialize};

use crate::routing::RoutingMode;

/// Body of a query submission. `query` is optional so a missing field
/// becomes a `BadRequest` instead of a deserialization rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModeRequest {
    #[serde(default)]
    pub mode: Option<String>,
}

/// Confirmation returned after a mode switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeResponse {
    pub message: String,
    pub mode: RoutingMode,
}

impl ModeResponse {
    pub fn updated(mode: RoutingMode) -> Self {
        Self {
            message: "mode updated".to_string(),
            mode,
        }
    }
}
