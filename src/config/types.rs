use serde::{Deserialize, Serialize};

/// Root configuration container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub gate: GateConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Required by `proxy` and `serve`; the stand-alone gate ignores it.
    #[serde(default)]
    pub cluster: ClusterConfig,
}

/// Listener addresses for the two HTTP surfaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address of the internal routing proxy (host:port).
    ///
    /// The proxy has no credential check and no denylist, so keep it on
    /// loopback or a private network.
    #[serde(default = "default_proxy_bind_addr")]
    pub proxy_bind_addr: String,
    /// Bind address of the public gate (host:port).
    #[serde(default = "default_gate_bind_addr")]
    pub gate_bind_addr: String,
    /// Also open the proxy listener under `serve` (default: false).
    /// The gate always reaches the proxy in-process there.
    #[serde(default)]
    pub serve_proxy_listener: bool,
}

/// Access-control settings for the public gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Shared secret expected in the `x-api-key` header.
    #[serde(default = "default_api_key")]
    pub api_key: String,
    /// Base URL of the proxy when the gate runs as its own process.
    #[serde(default = "default_proxy_url")]
    pub proxy_url: String,
    /// Total timeout for a forwarded request in seconds (default: 30).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u32,
    /// Extra denylist rules, evaluated after the built-in ones.
    #[serde(default)]
    pub deny_rules: Vec<DenyRuleConfig>,
}

/// A denylist rule as written in the config file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DenyRuleConfig {
    /// Identifier reported when the rule rejects a query.
    pub id: String,
    /// Regular expression matched against the lower-cased query.
    pub pattern: String,
}

/// Read-routing policy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Initial routing mode: "direct", "random" or "latency".
    #[serde(default = "default_mode")]
    pub mode: String,
    /// Upper bound for a single latency probe in milliseconds (default: 500).
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

/// Credentials and pool sizing shared by every backend connection.
///
/// Backends are reached over the PostgreSQL wire protocol; `engine`
/// only accepts `"postgres"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_engine")]
    pub engine: String,
    #[serde(default = "default_db_user")]
    pub user: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_db_name")]
    pub dbname: String,
    /// Connection timeout in seconds (default: 5).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u32,
    /// Max pooled connections per backend (default: 8).
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: usize,
}

/// Resolved cluster topology handed over by provisioning.
///
/// Empty by default; may be filled from the file, the environment or both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Address of the writable primary (host:port).
    #[serde(default)]
    pub primary: String,
    /// Ordered replica addresses (host:port).
    #[serde(default)]
    pub replicas: Vec<String>,
}

fn default_proxy_bind_addr() -> String {
    "127.0.0.1:5000".to_string()
}

fn default_gate_bind_addr() -> String {
    "0.0.0.0:5001".to_string()
}

fn default_api_key() -> String {
    "secret123".to_string()
}

fn default_proxy_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_request_timeout() -> u32 {
    30
}

fn default_mode() -> String {
    "direct".to_string()
}

fn default_probe_timeout_ms() -> u64 {
    500
}

/// The only engine with an executor.
pub const POSTGRES_ENGINE: &str = "postgres";

fn default_db_engine() -> String {
    POSTGRES_ENGINE.to_string()
}

fn default_db_user() -> String {
    "root".to_string()
}

fn default_db_name() -> String {
    "sakila".to_string()
}

fn default_connect_timeout() -> u32 {
    5
}

fn default_pool_max_size() -> usize {
    8
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            proxy_bind_addr: default_proxy_bind_addr(),
            gate_bind_addr: default_gate_bind_addr(),
            serve_proxy_listener: false,
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            api_key: default_api_key(),
            proxy_url: default_proxy_url(),
            request_timeout_seconds: default_request_timeout(),
            deny_rules: Vec::new(),
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            engine: default_db_engine(),
            user: default_db_user(),
            password: None,
            dbname: default_db_name(),
            connect_timeout_seconds: default_connect_timeout(),
            pool_max_size: default_pool_max_size(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            gate: GateConfig::default(),
            routing: RoutingConfig::default(),
            database: DatabaseConfig::default(),
            cluster: ClusterConfig::default(),
        }
    }
}
