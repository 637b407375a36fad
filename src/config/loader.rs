use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::types::{Config, POSTGRES_ENGINE};
use crate::gate::safety::SafetyFilter;
use crate::routing::RoutingMode;

/// Environment variable overriding `gate.api_key`.
pub const ENV_API_KEY: &str = "DBGATE_API_KEY";
/// Environment variable overriding `cluster.primary`.
pub const ENV_PRIMARY: &str = "DBGATE_PRIMARY";
/// Environment variable overriding `cluster.replicas` (comma separated).
pub const ENV_REPLICAS: &str = "DBGATE_REPLICAS";

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

impl Config {
    /// Returns the path to the configuration file.
    ///
    /// Uses `~/.config/dbgate/config.toml` on Unix/macOS, or the
    /// equivalent from `dirs::config_dir()` elsewhere.
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("dbgate").join("config.toml")
    }

    /// Loads configuration from the default config file.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Loads configuration from `path`, applies environment overrides
    /// and validates the gate settings.
    ///
    /// A missing file is an error. Callers that route queries must also
    /// run [`validate_router`](Self::validate_router).
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Overrides credential and topology from the environment.
    ///
    /// Provisioning hands these over as environment variables when it
    /// launches the router, so they take precedence over the file.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_API_KEY).filter(|k| !k.is_empty()) {
            self.gate.api_key = key;
        }
        if let Some(primary) = lookup(ENV_PRIMARY).filter(|p| !p.trim().is_empty()) {
            self.cluster.primary = primary.trim().to_string();
        }
        if let Some(replicas) = lookup(ENV_REPLICAS) {
            let replicas: Vec<String> = replicas
                .split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(String::from)
                .collect();
            if !replicas.is_empty() {
                self.cluster.replicas = replicas;
            }
        }
    }

    /// Validates the settings every subcommand depends on.
    ///
    /// Checks:
    /// - The gate credential is not empty
    /// - Every configured deny rule compiles
    /// - The forward timeout is non-zero
    ///
    /// Topology is checked separately by [`validate_router`](Self::validate_router)
    /// because the stand-alone gate never reads it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gate.api_key.is_empty() {
            return Err(validation_error("gate.api_key must not be empty"));
        }

        if self.gate.request_timeout_seconds == 0 {
            return Err(validation_error(
                "gate.request_timeout_seconds must be greater than zero",
            ));
        }

        SafetyFilter::with_extra_rules(&self.gate.deny_rules)
            .map_err(|e| validation_error(e.to_string()))?;

        Ok(())
    }

    /// Validates what the routing proxy needs on top of [`validate`](Self::validate).
    ///
    /// Checks:
    /// - A primary and at least one replica are configured
    /// - The initial routing mode is known
    /// - The probe and connect timeouts are non-zero
    /// - The database engine is supported
    pub fn validate_router(&self) -> Result<(), ConfigError> {
        self.validate()?;

        if self.cluster.primary.trim().is_empty() {
            return Err(validation_error(format!(
                "cluster.primary must be set (or {})",
                ENV_PRIMARY
            )));
        }

        if self.cluster.replicas.is_empty() {
            return Err(validation_error(format!(
                "At least one replica must be configured (cluster.replicas or {})",
                ENV_REPLICAS
            )));
        }

        if self.routing.mode.parse::<RoutingMode>().is_err() {
            return Err(validation_error(format!(
                "Unknown routing mode '{}'",
                self.routing.mode
            )));
        }

        if self.routing.probe_timeout_ms == 0 {
            return Err(validation_error(
                "routing.probe_timeout_ms must be greater than zero",
            ));
        }

        if self.database.connect_timeout_seconds == 0 {
            return Err(validation_error(
                "database.connect_timeout_seconds must be greater than zero",
            ));
        }

        if !self.database.engine.eq_ignore_ascii_case(POSTGRES_ENGINE) {
            return Err(validation_error(format!(
                "Unsupported database.engine '{}' (only '{}' is supported)",
                self.database.engine, POSTGRES_ENGINE
            )));
        }

        Ok(())
    }
}

fn validation_error(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        message: message.into(),
    }
}
