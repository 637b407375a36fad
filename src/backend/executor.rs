//! Statement execution against a resolved backend.
//!
//! One connection pool per backend, created at startup. Pools connect
//! lazily, so an unreachable replica only fails the requests routed to it.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_postgres::{Config as PoolSettings, Pool, PoolConfig, Runtime};
use serde::{Deserialize, Serialize};
use tokio_postgres::{NoTls, SimpleQueryMessage};

use crate::backend::{BackendEndpoint, BackendRegistry};
use crate::config::DatabaseConfig;
use crate::error::GateError;

/// One result row; text-protocol column values, `None` for SQL NULL.
pub type Row = Vec<Option<String>>;

/// Rows produced by a statement. Empty for statements without a row set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub result: Vec<Row>,
}

/// Runs a query on a specific backend.
///
/// Implementations must not retry on another backend: a failure is
/// reported for the endpoint that was asked.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(
        &self,
        endpoint: &BackendEndpoint,
        query: &str,
    ) -> Result<QueryResponse, GateError>;
}

/// PostgreSQL executor backed by a `deadpool-postgres` pool per backend.
pub struct PgExecutor {
    pools: HashMap<String, Pool>,
}

impl PgExecutor {
    /// Build one pool per registry endpoint.
    pub fn new(registry: &BackendRegistry, database: &DatabaseConfig) -> Result<Self, GateError> {
        let mut pools = HashMap::new();
        for endpoint in registry.endpoints() {
            let pool = create_pool(endpoint, database)?;
            pools.insert(endpoint.label().to_string(), pool);
        }
        Ok(Self { pools })
    }
}

fn create_pool(endpoint: &BackendEndpoint, database: &DatabaseConfig) -> Result<Pool, GateError> {
    let (host, port) = split_host_port(endpoint.addr()).ok_or_else(|| {
        GateError::Internal(format!(
            "Backend '{}' has an invalid address '{}'",
            endpoint.label(),
            endpoint.addr()
        ))
    })?;

    let mut cfg = PoolSettings::new();
    cfg.host = Some(host.to_string());
    cfg.port = Some(port);
    cfg.user = Some(database.user.clone());
    cfg.password = database.password.clone();
    cfg.dbname = Some(database.dbname.clone());
    cfg.connect_timeout = Some(Duration::from_secs(database.connect_timeout_seconds as u64));
    cfg.pool = Some(PoolConfig {
        max_size: database.pool_max_size,
        ..Default::default()
    });

    cfg.create_pool(Some(Runtime::Tokio1), NoTls).map_err(|e| {
        GateError::Internal(format!(
            "Failed to create pool for '{}': {}",
            endpoint.label(),
            e
        ))
    })
}

/// Split `host:port`, accepting bracketed IPv6 hosts.
fn split_host_port(addr: &str) -> Option<(&str, u16)> {
    let (host, port) = addr.rsplit_once(':')?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        return None;
    }
    Some((host, port.parse().ok()?))
}

#[async_trait]
impl QueryExecutor for PgExecutor {
    async fn execute(
        &self,
        endpoint: &BackendEndpoint,
        query: &str,
    ) -> Result<QueryResponse, GateError> {
        let pool = self.pools.get(endpoint.label()).ok_or_else(|| {
            GateError::Internal(format!("No pool for backend '{}'", endpoint.label()))
        })?;

        let client = pool.get().await.map_err(|e| GateError::BackendUnavailable {
            backend: endpoint.label().to_string(),
            reason: e.to_string(),
        })?;

        let messages = client.simple_query(query).await.map_err(|e| {
            if e.is_closed() {
                GateError::BackendUnavailable {
                    backend: endpoint.label().to_string(),
                    reason: e.to_string(),
                }
            } else {
                GateError::Execution {
                    backend: endpoint.label().to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        let result = messages
            .iter()
            .filter_map(|message| match message {
                SimpleQueryMessage::Row(row) => {
                    Some((0..row.len()).map(|i| row.get(i).map(String::from)).collect())
                }
                _ => None,
            })
            .collect();

        Ok(QueryResponse { result })
    }
}
