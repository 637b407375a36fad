//! The routing proxy: classify, pick a backend, count the hit, execute.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::backend::{BackendRegistry, PgExecutor, QueryExecutor, QueryResponse};
use crate::config::Config;
use crate::error::GateError;
use crate::routing::{classify, RoutingEngine, RoutingMode, StatsReport, TcpProber};

/// Cheap-to-clone handle over the routing engine and the executor.
#[derive(Clone)]
pub struct ProxyService {
    engine: Arc<RoutingEngine>,
    executor: Arc<dyn QueryExecutor>,
}

impl ProxyService {
    pub fn new(engine: Arc<RoutingEngine>, executor: Arc<dyn QueryExecutor>) -> Self {
        Self { engine, executor }
    }

    /// Wire the production registry, TCP prober and PostgreSQL executor.
    ///
    /// `mode` overrides `routing.mode` from the config.
    pub fn from_config(config: &Config, mode: Option<RoutingMode>) -> anyhow::Result<Self> {
        config.validate_router()?;

        let registry =
            Arc::new(BackendRegistry::from_config(&config.cluster).context("Invalid cluster")?);
        let mode = match mode {
            Some(mode) => mode,
            None => config.routing.mode.parse()?,
        };
        let probe_timeout = Duration::from_millis(config.routing.probe_timeout_ms);

        let executor = PgExecutor::new(&registry, &config.database)?;
        let engine = RoutingEngine::new(
            registry.clone(),
            mode,
            Arc::new(TcpProber::new(probe_timeout)),
            probe_timeout,
        );

        tracing::info!(
            primary = %registry.primary().addr(),
            replicas = registry.replicas().len(),
            mode = %mode,
            "Routing proxy configured"
        );

        Ok(Self::new(Arc::new(engine), Arc::new(executor)))
    }

    pub fn engine(&self) -> &RoutingEngine {
        &self.engine
    }

    /// Route and execute one query.
    ///
    /// Execution errors are returned for the backend that was picked;
    /// there is no failover to another backend.
    pub async fn query(&self, query: &str) -> Result<QueryResponse, GateError> {
        if query.trim().is_empty() {
            return Err(GateError::BadRequest("Missing query".to_string()));
        }

        let classification = classify(query);
        let target = self.engine.resolve(query, classification).await;

        self.executor.execute(target, query).await.inspect_err(|e| {
            tracing::warn!(
                backend = %target.label(),
                classification = %classification,
                error = %e,
                "Query execution failed"
            );
        })
    }

    pub fn set_mode(&self, mode: &str) -> Result<RoutingMode, GateError> {
        self.engine.set_mode(mode)
    }

    /// Current mode and hit counts. Reading consumes the counters.
    pub fn take_stats(&self) -> StatsReport {
        self.engine.take_stats()
    }
}
