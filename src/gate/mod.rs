//! Public entry point: authenticate, validate, filter, then forward.
//!
//! Nothing reaches the proxy unless the caller presented the configured
//! key and the query passed the denylist.

pub mod auth;
mod router;
pub mod safety;
mod upstream;

use std::sync::Arc;

pub use auth::{ApiKey, API_KEY_HEADER};
pub use router::build_router;
pub use safety::{SafetyError, SafetyFilter, SafetyVerdict};
pub use upstream::{HttpUpstream, Upstream};

use crate::backend::QueryResponse;
use crate::config::GateConfig;
use crate::error::GateError;
use crate::routing::{RoutingMode, StatsReport};

#[derive(Clone)]
pub struct Gate {
    api_key: ApiKey,
    filter: Arc<SafetyFilter>,
    upstream: Arc<dyn Upstream>,
}

impl Gate {
    pub fn new(api_key: ApiKey, filter: SafetyFilter, upstream: Arc<dyn Upstream>) -> Self {
        Self {
            api_key,
            filter: Arc::new(filter),
            upstream,
        }
    }

    /// Credential and denylist from `[gate]`, traffic to `upstream`.
    pub fn from_config(
        config: &GateConfig,
        upstream: Arc<dyn Upstream>,
    ) -> Result<Self, SafetyError> {
        let filter = SafetyFilter::with_extra_rules(&config.deny_rules)?;
        tracing::info!(rules = filter.rule_ids().count(), "Gate denylist loaded");
        Ok(Self::new(ApiKey::new(config.api_key.clone()), filter, upstream))
    }

    fn authenticate(&self, api_key: Option<&str>) -> Result<(), GateError> {
        if self.api_key.verify(api_key) {
            Ok(())
        } else {
            tracing::warn!(key_present = api_key.is_some(), "Rejected unauthenticated request");
            Err(GateError::Unauthorized)
        }
    }

    /// Check and forward a query.
    pub async fn handle(
        &self,
        api_key: Option<&str>,
        query: Option<&str>,
    ) -> Result<QueryResponse, GateError> {
        self.authenticate(api_key)?;

        let query = query
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| GateError::BadRequest("No query provided".to_string()))?;

        if let SafetyVerdict::Rejected(rule) = self.filter.check(query) {
            tracing::warn!(rule = %rule, "Query rejected by denylist");
            return Err(GateError::QueryRejected { rule });
        }

        self.upstream.query(query).await
    }

    pub async fn set_mode(
        &self,
        api_key: Option<&str>,
        mode: Option<&str>,
    ) -> Result<RoutingMode, GateError> {
        self.authenticate(api_key)?;
        let mode = mode.ok_or_else(|| GateError::BadRequest("No mode provided".to_string()))?;
        self.upstream.set_mode(mode).await
    }

    /// Reading stats consumes the proxy's counters.
    pub async fn get_stats(&self, api_key: Option<&str>) -> Result<StatsReport, GateError> {
        self.authenticate(api_key)?;
        self.upstream.stats().await
    }
}
