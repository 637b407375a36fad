//! Where the gate sends traffic that passed its checks.
//!
//! The proxy can live in the same process ([`ProxyService`]) or behind
//! HTTP ([`HttpUpstream`]). Either way the caller sees the proxy's
//! answer unchanged in shape.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use crate::backend::QueryResponse;
use crate::error::{ErrorResponse, GateError};
use crate::proxy::types::{ModeRequest, ModeResponse, QueryRequest};
use crate::proxy::ProxyService;
use crate::routing::{RoutingMode, StatsReport};

#[async_trait]
pub trait Upstream: Send + Sync {
    async fn query(&self, query: &str) -> Result<QueryResponse, GateError>;
    async fn set_mode(&self, mode: &str) -> Result<RoutingMode, GateError>;
    async fn stats(&self) -> Result<StatsReport, GateError>;
}

#[async_trait]
impl Upstream for ProxyService {
    async fn query(&self, query: &str) -> Result<QueryResponse, GateError> {
        ProxyService::query(self, query).await
    }

    async fn set_mode(&self, mode: &str) -> Result<RoutingMode, GateError> {
        ProxyService::set_mode(self, mode)
    }

    async fn stats(&self) -> Result<StatsReport, GateError> {
        Ok(self.take_stats())
    }
}

/// Forwards to a proxy running as its own service.
pub struct HttpUpstream {
    client: Client,
    base_url: String,
}

impl HttpUpstream {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GateError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GateError::Internal(format!("Failed to build upstream client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Decode a success body, or relay the proxy's error document as-is.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GateError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| GateError::Upstream(format!("Invalid proxy response: {}", e)));
    }

    let body = match response.json::<serde_json::Value>().await {
        Ok(body) => body,
        Err(e) => {
            let err = GateError::Upstream(format!(
                "Proxy returned {} with an unreadable body: {}",
                status, e
            ));
            ErrorResponse::body(&err, &uuid::Uuid::new_v4().to_string())
        }
    };
    Err(GateError::Proxied {
        status: status.as_u16(),
        body,
    })
}

fn transport_error(e: reqwest::Error) -> GateError {
    GateError::Upstream(e.to_string())
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn query(&self, query: &str) -> Result<QueryResponse, GateError> {
        let response = self
            .client
            .post(self.url("/query"))
            .json(&QueryRequest {
                query: Some(query.to_string()),
            })
            .send()
            .await
            .map_err(transport_error)?;
        decode(response).await
    }

    async fn set_mode(&self, mode: &str) -> Result<RoutingMode, GateError> {
        let response = self
            .client
            .post(self.url("/set_mode"))
            .json(&ModeRequest {
                mode: Some(mode.to_string()),
            })
            .send()
            .await
            .map_err(transport_error)?;
        decode::<ModeResponse>(response).await.map(|r| r.mode)
    }

    async fn stats(&self) -> Result<StatsReport, GateError> {
        let response = self
            .client
            .get(self.url("/stats"))
            .send()
            .await
            .map_err(transport_error)?;
        decode(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let upstream = HttpUpstream::new("http://10.0.0.5:5000/", Duration::from_secs(1)).unwrap();
        assert_eq!(upstream.url("/query"), "http://10.0.0.5:5000/query");
    }

    #[tokio::test]
    async fn test_unreachable_proxy_is_upstream_error() {
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let upstream =
            HttpUpstream::new(&format!("http://{}", addr), Duration::from_secs(2)).unwrap();
        assert!(matches!(
            upstream.query("SELECT 1").await,
            Err(GateError::Upstream(_))
        ));
    }

    #[tokio::test]
    async fn test_non_json_error_body_keeps_error_shape() {
        use axum::http::StatusCode;
        use axum::routing::post;

        let app = axum::Router::new().route(
            "/query",
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "proxy restarting") }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let upstream =
            HttpUpstream::new(&format!("http://{}", addr), Duration::from_secs(2)).unwrap();
        match upstream.query("SELECT 1").await {
            Err(GateError::Proxied { status, body }) => {
                assert_eq!(status, 503);
                assert_eq!(body["error"]["type"], "upstream_error");
                assert!(body["error"]["message"].as_str().unwrap().contains("503"));
                assert!(body["error"]["request_id"].is_string());
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
