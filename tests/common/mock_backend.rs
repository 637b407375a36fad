//! In-memory stand-ins for database backends and latency probes.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use dbgate::backend::{BackendEndpoint, QueryExecutor, QueryResponse};
use dbgate::error::GateError;
use dbgate::routing::{ProbeResult, Prober};
use parking_lot::Mutex;

/// A query as seen by a backend, for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedQuery {
    pub backend: String,
    pub query: String,
}

/// A scripted backend answer.
#[derive(Debug, Clone)]
pub enum MockResult {
    Rows(Vec<Vec<Option<String>>>),
    Unavailable,
    Error(String),
}

impl Default for MockResult {
    fn default() -> Self {
        MockResult::Rows(vec![vec![Some("1".to_string())]])
    }
}

impl MockResult {
    pub fn rows(rows: &[&[&str]]) -> Self {
        MockResult::Rows(
            rows.iter()
                .map(|row| row.iter().map(|v| Some(v.to_string())).collect())
                .collect(),
        )
    }
}

/// Executor that records every call and replays queued results per backend.
#[derive(Default)]
pub struct MockExecutor {
    captured: Mutex<Vec<CapturedQuery>>,
    results: Mutex<HashMap<String, VecDeque<MockResult>>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next answer for `backend` (label). Unqueued calls get the default.
    pub fn enqueue(&self, backend: &str, result: MockResult) {
        self.results
            .lock()
            .entry(backend.to_string())
            .or_default()
            .push_back(result);
    }

    pub fn captured(&self) -> Vec<CapturedQuery> {
        self.captured.lock().clone()
    }

    pub fn count_for(&self, backend: &str) -> usize {
        self.captured
            .lock()
            .iter()
            .filter(|c| c.backend == backend)
            .count()
    }
}

#[async_trait]
impl QueryExecutor for MockExecutor {
    async fn execute(
        &self,
        endpoint: &BackendEndpoint,
        query: &str,
    ) -> Result<QueryResponse, GateError> {
        self.captured.lock().push(CapturedQuery {
            backend: endpoint.label().to_string(),
            query: query.to_string(),
        });

        let next = self
            .results
            .lock()
            .get_mut(endpoint.label())
            .and_then(VecDeque::pop_front)
            .unwrap_or_default();

        match next {
            MockResult::Rows(result) => Ok(QueryResponse { result }),
            MockResult::Unavailable => Err(GateError::BackendUnavailable {
                backend: endpoint.label().to_string(),
                reason: "connection refused".to_string(),
            }),
            MockResult::Error(message) => Err(GateError::Execution {
                backend: endpoint.label().to_string(),
                message,
            }),
        }
    }
}

/// Prober answering after a fixed delay per label; missing labels fail.
#[derive(Default)]
pub struct ScriptedProber {
    delays: HashMap<String, Duration>,
}

impl ScriptedProber {
    pub fn new(delays: &[(&str, u64)]) -> Self {
        Self {
            delays: delays
                .iter()
                .map(|(label, ms)| (label.to_string(), Duration::from_millis(*ms)))
                .collect(),
        }
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, endpoint: &BackendEndpoint) -> ProbeResult {
        match self.delays.get(endpoint.label()) {
            Some(delay) => {
                tokio::time::sleep(*delay).await;
                ProbeResult::reachable(endpoint, *delay)
            }
            None => ProbeResult::failed(endpoint),
        }
    }
}
