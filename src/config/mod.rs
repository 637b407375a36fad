//! Configuration loading: TOML file, environment overrides, validation.

mod loader;
mod types;

pub use loader::{ConfigError, ENV_API_KEY, ENV_PRIMARY, ENV_REPLICAS};
pub use types::{
    ClusterConfig, Config, DatabaseConfig, DenyRuleConfig, GateConfig, RoutingConfig,
    ServerConfig, POSTGRES_ENGINE,
};
