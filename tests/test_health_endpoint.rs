mod common;

use common::{proxy_service, spawn_proxy};
use dbgate::proxy::health::{health_handler, HealthStatus};
use dbgate::routing::RoutingMode;

#[tokio::test]
async fn test_health_handler() {
    let axum::Json(status) = health_handler().await;
    assert_eq!(status.status, "healthy");
    assert_eq!(status.service, "dbgate");
}

#[tokio::test]
async fn test_proxy_health_endpoint() {
    let (service, executor) = proxy_service(RoutingMode::Direct);
    let (addr, handle) = spawn_proxy(service).await;

    let resp = reqwest::get(format!("http://{}/health", addr)).await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let status: HealthStatus = resp.json().await.unwrap();
    assert_eq!(status.status, "healthy");
    assert_eq!(status.service, "dbgate");

    // Health never touches a backend.
    assert!(executor.captured().is_empty());
    handle.shutdown();
}
