//! Shared test utilities and mock infrastructure.

#![allow(dead_code, unused_imports)]

pub mod mock_backend;

use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::time::Duration;

use dbgate::backend::BackendRegistry;
use dbgate::gate::{self, ApiKey, Gate, SafetyFilter, Upstream};
use dbgate::proxy::{self, HttpServer, ProxyService, ServerHandle};
use dbgate::routing::{Prober, RoutingEngine, RoutingMode};

use mock_backend::{MockExecutor, ScriptedProber};

pub const API_KEY: &str = "secret123";

/// Find an available port for testing.
pub fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind to free port");
    listener.local_addr().unwrap().port()
}

/// primary + three replicas on unroutable test addresses.
pub fn test_registry() -> Arc<BackendRegistry> {
    Arc::new(
        BackendRegistry::new(
            "10.0.0.1:5432",
            ["10.0.0.2:5432", "10.0.0.3:5432", "10.0.0.4:5432"],
        )
        .unwrap(),
    )
}

pub fn proxy_service_with_prober(
    mode: RoutingMode,
    prober: Arc<dyn Prober>,
) -> (ProxyService, Arc<MockExecutor>) {
    let executor = Arc::new(MockExecutor::new());
    let engine = RoutingEngine::new(test_registry(), mode, prober, Duration::from_millis(200));
    let service = ProxyService::new(Arc::new(engine), executor.clone());
    (service, executor)
}

pub fn proxy_service(mode: RoutingMode) -> (ProxyService, Arc<MockExecutor>) {
    proxy_service_with_prober(mode, Arc::new(ScriptedProber::default()))
}

pub fn test_gate(upstream: Arc<dyn Upstream>) -> Gate {
    Gate::new(ApiKey::new(API_KEY), SafetyFilter::default(), upstream)
}

/// Bind `router` on a free local port and serve it in the background.
pub async fn spawn_server(name: &'static str, router: axum::Router) -> (SocketAddr, ServerHandle) {
    let mut server = HttpServer::new(name, router);
    let addr = server.try_bind("127.0.0.1:0").await.unwrap();
    let handle = server.handle();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    assert!(wait_for_server(addr, Duration::from_secs(2)).await);
    (addr, handle)
}

pub async fn spawn_proxy(service: ProxyService) -> (SocketAddr, ServerHandle) {
    spawn_server("proxy", proxy::build_router(service)).await
}

pub async fn spawn_gate(gate: Gate) -> (SocketAddr, ServerHandle) {
    spawn_server("gate", gate::build_router(gate)).await
}

/// Wait for a server to become available.
pub async fn wait_for_server(addr: SocketAddr, timeout: Duration) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if tokio::net::TcpStream::connect(addr).await.is_ok() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
