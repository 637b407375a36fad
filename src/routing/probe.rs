//! Connection-latency probes used by the latency routing mode.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::backend::BackendEndpoint;

/// Outcome of probing one backend. Consumed immediately, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub label: String,
    /// `None` when the backend could not be reached within budget.
    pub latency: Option<Duration>,
}

impl ProbeResult {
    pub fn reachable(endpoint: &BackendEndpoint, latency: Duration) -> Self {
        Self {
            label: endpoint.label().to_string(),
            latency: Some(latency),
        }
    }

    pub fn failed(endpoint: &BackendEndpoint) -> Self {
        Self {
            label: endpoint.label().to_string(),
            latency: None,
        }
    }
}

/// Measures how quickly a backend accepts a connection.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, endpoint: &BackendEndpoint) -> ProbeResult;
}

/// Times a plain TCP connect to the backend address.
pub struct TcpProber {
    timeout: Duration,
}

impl TcpProber {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl Prober for TcpProber {
    async fn probe(&self, endpoint: &BackendEndpoint) -> ProbeResult {
        let start = Instant::now();
        match timeout(self.timeout, TcpStream::connect(endpoint.addr())).await {
            Ok(Ok(_stream)) => ProbeResult::reachable(endpoint, start.elapsed()),
            Ok(Err(e)) => {
                tracing::debug!(backend = %endpoint.label(), error = %e, "Probe failed");
                ProbeResult::failed(endpoint)
            }
            Err(_) => {
                tracing::debug!(
                    backend = %endpoint.label(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Probe timed out"
                );
                ProbeResult::failed(endpoint)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendRegistry;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_tcp_probe_reachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let registry = BackendRegistry::new("127.0.0.1:1", [addr]).unwrap();

        let prober = TcpProber::new(Duration::from_secs(2));
        let result = prober.probe(&registry.replicas()[0]).await;
        assert_eq!(result.label, "replica-0");
        assert!(result.latency.is_some());
    }

    #[tokio::test]
    async fn test_tcp_probe_refused() {
        // Bind then drop to get a port nobody listens on.
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().to_string()
        };
        let registry = BackendRegistry::new("127.0.0.1:1", [addr]).unwrap();

        let prober = TcpProber::new(Duration::from_secs(2));
        let result = prober.probe(&registry.replicas()[0]).await;
        assert_eq!(result.latency, None);
    }
}
