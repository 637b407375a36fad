//! Backend selection for classified queries.
//!
//! Writes always go to the primary. Reads follow the active
//! [`RoutingMode`], which can be switched at runtime without touching
//! requests that already picked their mode.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;

use crate::backend::{BackendEndpoint, BackendRegistry};
use crate::error::GateError;
use crate::routing::classifier::QueryClassification;
use crate::routing::mode::{ModeCell, RoutingMode};
use crate::routing::probe::Prober;
use crate::routing::stats::StatsCollector;

/// Current mode plus the hit counts consumed by a stats read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsReport {
    pub mode: RoutingMode,
    pub hits: BTreeMap<String, u64>,
}

pub struct RoutingEngine {
    registry: Arc<BackendRegistry>,
    mode: ModeCell,
    prober: Arc<dyn Prober>,
    probe_timeout: Duration,
    stats: StatsCollector,
}

impl RoutingEngine {
    pub fn new(
        registry: Arc<BackendRegistry>,
        mode: RoutingMode,
        prober: Arc<dyn Prober>,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            mode: ModeCell::new(mode),
            prober,
            probe_timeout,
            stats: StatsCollector::new(),
        }
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    pub fn mode(&self) -> RoutingMode {
        self.mode.load()
    }

    /// Switch the read policy.
    ///
    /// # Errors
    /// Returns `InvalidMode` for an unknown mode string. The active mode is
    /// unchanged on error.
    pub fn set_mode(&self, mode: &str) -> Result<RoutingMode, GateError> {
        let new_mode: RoutingMode = mode.parse()?;
        let old_mode = self.mode.swap(new_mode);

        tracing::info!(
            old_mode = %old_mode,
            new_mode = %new_mode,
            "Routing mode switched"
        );

        Ok(new_mode)
    }

    pub fn stats(&self) -> &StatsCollector {
        &self.stats
    }

    /// Read and clear the hit counters.
    pub fn take_stats(&self) -> StatsReport {
        StatsReport {
            mode: self.mode(),
            hits: self.stats.snapshot_and_reset().into_iter().collect(),
        }
    }

    /// Pick the backend for a query and record a hit for it.
    pub async fn resolve(
        &self,
        query: &str,
        classification: QueryClassification,
    ) -> &BackendEndpoint {
        // Read the mode once so a concurrent switch cannot split this decision.
        let mode = self.mode();

        let target = match classification {
            QueryClassification::Write => self.registry.primary(),
            QueryClassification::Read => match mode {
                RoutingMode::Direct => self.registry.primary(),
                RoutingMode::Random => self.random_replica(),
                RoutingMode::Latency => self.fastest_replica().await,
            },
        };

        self.stats.increment(target.label());

        tracing::debug!(
            backend = %target.label(),
            mode = %mode,
            classification = %classification,
            "Query routed"
        );
        tracing::trace!(query = %query, backend = %target.label(), "Routed query text");

        target
    }

    fn random_replica(&self) -> &BackendEndpoint {
        let replicas = self.registry.replicas();
        let index = rand::thread_rng().gen_range(0..replicas.len());
        &replicas[index]
    }

    /// Probe every replica at once and take the quickest to connect.
    ///
    /// Ties go to the replica listed first. If nothing answers within the
    /// probe budget, fall back to a random replica.
    async fn fastest_replica(&self) -> &BackendEndpoint {
        let replicas = self.registry.replicas();
        let probes = replicas.iter().map(|endpoint| async move {
            match timeout(self.probe_timeout, self.prober.probe(endpoint)).await {
                Ok(result) => result.latency,
                Err(_) => {
                    tracing::debug!(backend = %endpoint.label(), "Probe abandoned after budget");
                    None
                }
            }
        });
        let latencies = join_all(probes).await;

        let mut best: Option<(usize, Duration)> = None;
        for (index, latency) in latencies.into_iter().enumerate() {
            let Some(latency) = latency else {
                continue;
            };
            if best.map_or(true, |(_, fastest)| latency < fastest) {
                best = Some((index, latency));
            }
        }

        match best {
            Some((index, latency)) => {
                tracing::debug!(
                    backend = %replicas[index].label(),
                    latency_us = latency.as_micros() as u64,
                    "Fastest replica selected"
                );
                &replicas[index]
            }
            None => {
                tracing::warn!("All replica probes failed, falling back to random replica");
                self.random_replica()
            }
        }
    }
}
