use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use axum::Router;
use tokio::net::TcpListener;

use crate::proxy::connection::ConnectionCounter;
use crate::proxy::shutdown::ShutdownManager;

/// An axum application bound to one listener, with graceful shutdown.
pub struct HttpServer {
    name: &'static str,
    pub addr: SocketAddr,
    /// The bound listener, kept alive to prevent port race conditions.
    /// Populated by try_bind(), consumed by run().
    listener: Option<TcpListener>,
    app: Router,
    shutdown: Arc<ShutdownManager>,
}

impl HttpServer {
    pub fn new(name: &'static str, app: Router) -> Self {
        Self {
            name,
            addr: SocketAddr::from(([127, 0, 0, 1], 0)), // Will be determined at bind time
            listener: None,
            app,
            shutdown: Arc::new(ShutdownManager::new()),
        }
    }

    /// Share a shutdown manager with other servers in the same process.
    pub fn with_shutdown(mut self, shutdown: Arc<ShutdownManager>) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Bind the listener now so the port is held until run().
    ///
    /// Port 0 picks a free port; the actual address is returned.
    pub async fn try_bind(&mut self, bind_addr: &str) -> anyhow::Result<SocketAddr> {
        let addr: SocketAddr = bind_addr
            .parse()
            .with_context(|| format!("Invalid bind address '{}'", bind_addr))?;

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {} to {}", self.name, addr))?;
        let actual_addr = listener.local_addr()?;

        self.addr = actual_addr;
        self.listener = Some(listener);
        tracing::info!(server = self.name, addr = %actual_addr, "Bound listener");
        Ok(actual_addr)
    }

    pub fn shutdown_handle(&self) -> Arc<ShutdownManager> {
        self.shutdown.clone()
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            shutdown: self.shutdown.clone(),
        }
    }

    /// Run the server until shutdown.
    ///
    /// Consumes self to take ownership of the pre-bound listener.
    /// Call try_bind() before run().
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = self
            .listener
            .ok_or_else(|| anyhow!("try_bind() must be called before run()"))?;

        tracing::info!(server = self.name, addr = %self.addr, "Serving");

        let make_service = self.app.into_make_service();
        let make_service = ConnectionCounter::new(make_service, self.shutdown.clone());

        let shutdown = self.shutdown.clone();
        axum::serve(listener, make_service)
            .with_graceful_shutdown(async move {
                if let Err(e) = shutdown.wait_for_shutdown().await {
                    tracing::error!(error = %e, "Failed to install signal handlers");
                }
            })
            .into_future()
            .await?;

        self.shutdown.wait_for_connections(Duration::from_secs(10)).await;
        tracing::info!(server = self.name, "Shut down");

        Ok(())
    }
}

#[derive(Clone)]
pub struct ServerHandle {
    shutdown: Arc<ShutdownManager>,
}

impl ServerHandle {
    pub fn shutdown(&self) {
        self.shutdown.signal_shutdown();
    }
}
