use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use futures::future::join_all;

use dbgate::config::Config;
use dbgate::gate::{self, Gate, HttpUpstream};
use dbgate::logging::init_tracing;
use dbgate::proxy::{self, HttpServer, ProxyService};
use dbgate::routing::RoutingMode;

#[derive(Parser, Debug)]
#[command(name = "dbgate", version, about = "Authenticating gate and read/write router for a replicated database")]
struct Cli {
    /// Config file (default: ~/.config/dbgate/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Initial routing mode: direct, random or latency
    #[arg(long, global = true, value_parser = parse_mode)]
    mode: Option<RoutingMode>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Run the internal routing proxy
    Proxy,
    /// Run the public gate, forwarding to `gate.proxy_url`
    Gate,
    /// Run gate and proxy in one process
    Serve,
}

fn parse_mode(s: &str) -> Result<RoutingMode, String> {
    s.parse().map_err(|e: dbgate::error::GateError| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => Config::load().context("Failed to load default config")?,
    };

    match cli.command {
        Command::Proxy => run_proxy(&config, cli.mode).await,
        Command::Gate => run_gate(&config, cli.mode).await,
        Command::Serve => run_serve(&config, cli.mode).await,
    }
}

async fn run_proxy(config: &Config, mode: Option<RoutingMode>) -> anyhow::Result<()> {
    let service = ProxyService::from_config(config, mode)?;
    let mut server = HttpServer::new("proxy", proxy::build_router(service));
    server.try_bind(&config.server.proxy_bind_addr).await?;
    server.run().await
}

/// The stand-alone gate has no routing state; `[cluster]` and `[routing]`
/// are not read.
async fn run_gate(config: &Config, mode: Option<RoutingMode>) -> anyhow::Result<()> {
    if let Some(mode) = mode {
        tracing::warn!(mode = %mode, "--mode is ignored by the gate; pass it to the proxy");
    }

    let timeout = Duration::from_secs(config.gate.request_timeout_seconds as u64);
    let upstream = HttpUpstream::new(&config.gate.proxy_url, timeout)?;
    tracing::info!(proxy_url = %config.gate.proxy_url, "Gate forwarding over HTTP");

    let gate = Gate::from_config(&config.gate, Arc::new(upstream))?;
    let mut server = HttpServer::new("gate", gate::build_router(gate));
    server.try_bind(&config.server.gate_bind_addr).await?;
    server.run().await
}

async fn run_serve(config: &Config, mode: Option<RoutingMode>) -> anyhow::Result<()> {
    let service = ProxyService::from_config(config, mode)?;
    let servers = bind_serve(config, service).await?;

    for result in join_all(servers.into_iter().map(HttpServer::run)).await {
        result?;
    }
    Ok(())
}

/// Bind the servers for `serve`.
///
/// The gate calls the proxy in-process. The unauthenticated proxy
/// listener is opened only with `server.serve_proxy_listener`.
async fn bind_serve(config: &Config, service: ProxyService) -> anyhow::Result<Vec<HttpServer>> {
    let gate = Gate::from_config(&config.gate, Arc::new(service.clone()))?;
    let mut gate_server = HttpServer::new("gate", gate::build_router(gate));
    gate_server.try_bind(&config.server.gate_bind_addr).await?;
    let shutdown = gate_server.shutdown_handle();
    let mut servers = vec![gate_server];

    if config.server.serve_proxy_listener {
        let mut proxy_server =
            HttpServer::new("proxy", proxy::build_router(service)).with_shutdown(shutdown);
        proxy_server.try_bind(&config.server.proxy_bind_addr).await?;
        servers.push(proxy_server);
    } else {
        tracing::info!("Proxy listener disabled, gate forwards in-process");
    }

    Ok(servers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_subcommand_and_globals() {
        let cli = Cli::parse_from(["dbgate", "--config", "/tmp/c.toml", "serve", "--mode", "custom"]);
        assert_eq!(cli.command, Command::Serve);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        assert_eq!(cli.mode, Some(RoutingMode::Latency));
    }

    #[test]
    fn parse_rejects_unknown_mode() {
        assert!(Cli::try_parse_from(["dbgate", "proxy", "--mode", "bogus"]).is_err());
    }

    #[test]
    fn mode_is_optional() {
        let cli = Cli::parse_from(["dbgate", "gate"]);
        assert_eq!(cli.command, Command::Gate);
        assert!(cli.mode.is_none());
    }

    fn serve_config() -> Config {
        let mut config = Config::default();
        config.server.gate_bind_addr = "127.0.0.1:0".to_string();
        config.server.proxy_bind_addr = "127.0.0.1:0".to_string();
        config.cluster.primary = "127.0.0.1:15432".to_string();
        config.cluster.replicas = vec!["127.0.0.1:15433".to_string()];
        config
    }

    #[test]
    fn default_proxy_bind_is_loopback() {
        let addr: std::net::SocketAddr = Config::default().server.proxy_bind_addr.parse().unwrap();
        assert!(addr.ip().is_loopback());
        assert!(!Config::default().server.serve_proxy_listener);
    }

    #[tokio::test]
    async fn serve_defaults_expose_only_the_gate() {
        let config = serve_config();
        let service = ProxyService::from_config(&config, None).unwrap();

        let servers = bind_serve(&config, service).await.unwrap();
        assert_eq!(servers.len(), 1);

        let addr = servers[0].addr;
        let handle = servers[0].handle();
        for server in servers {
            tokio::spawn(server.run());
        }

        let client = reqwest::Client::new();
        let resp = client
            .post(format!("http://{}/query", addr))
            .json(&serde_json::json!({ "query": "DROP TABLE actor;" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 403);

        let resp = client
            .get(format!("http://{}/stats", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 403);

        handle.shutdown();
    }

    #[tokio::test]
    async fn serve_proxy_listener_is_opt_in() {
        let mut config = serve_config();
        config.server.serve_proxy_listener = true;
        let service = ProxyService::from_config(&config, None).unwrap();

        let servers = bind_serve(&config, service).await.unwrap();
        assert_eq!(servers.len(), 2);
        assert_ne!(servers[0].addr, servers[1].addr);

        // One shared shutdown stops both.
        let handle = servers[0].handle();
        let tasks: Vec<_> = servers.into_iter().map(|s| tokio::spawn(s.run())).collect();
        handle.shutdown();
        for task in tasks {
            tokio::time::timeout(Duration::from_secs(15), task)
                .await
                .unwrap()
                .unwrap()
                .unwrap();
        }
    }

    #[tokio::test]
    async fn gate_config_needs_no_cluster() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!(ProxyService::from_config(&config, None).is_err());
    }
}
