//! Static cluster topology: one primary, an ordered list of replicas.
//!
//! The registry is built once at startup and never changes afterwards,
//! so it is shared through `Arc` without any locking.

use std::collections::HashSet;
use std::fmt;

use thiserror::Error;

use crate::config::ClusterConfig;

/// Errors that can occur while building the registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No replicas are configured.
    #[error("No replicas configured")]
    NoReplicas,
    /// An address is empty or whitespace.
    #[error("Backend '{role}' has an empty address")]
    EmptyAddress { role: String },
    /// The same address appears twice.
    #[error("Address '{addr}' is used by more than one backend")]
    DuplicateAddress { addr: String },
}

/// Logical role of a backend in the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendRole {
    Primary,
    /// Replica at the given 0-based registry index.
    Replica(usize),
}

impl fmt::Display for BackendRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendRole::Primary => write!(f, "primary"),
            BackendRole::Replica(index) => write!(f, "replica-{}", index),
        }
    }
}

/// A reachable database host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendEndpoint {
    role: BackendRole,
    label: String,
    addr: String,
}

impl BackendEndpoint {
    fn new(role: BackendRole, addr: String) -> Self {
        Self {
            label: role.to_string(),
            role,
            addr,
        }
    }

    /// Human-readable role tag, used as the stats key.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Connection address (host:port).
    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn is_primary(&self) -> bool {
        self.role == BackendRole::Primary
    }
}

/// Immutable description of the cluster.
#[derive(Debug, Clone)]
pub struct BackendRegistry {
    primary: BackendEndpoint,
    replicas: Vec<BackendEndpoint>,
}

impl BackendRegistry {
    /// Build a registry from a primary address and ordered replica addresses.
    ///
    /// # Errors
    /// Fails if there are no replicas, an address is blank, or two
    /// backends share an address.
    pub fn new<P, R>(primary: P, replicas: R) -> Result<Self, RegistryError>
    where
        P: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        let primary = BackendEndpoint::new(BackendRole::Primary, primary.into().trim().to_string());
        let replicas: Vec<BackendEndpoint> = replicas
            .into_iter()
            .enumerate()
            .map(|(i, addr)| {
                BackendEndpoint::new(BackendRole::Replica(i), addr.into().trim().to_string())
            })
            .collect();

        if replicas.is_empty() {
            return Err(RegistryError::NoReplicas);
        }

        let mut seen = HashSet::new();
        for endpoint in std::iter::once(&primary).chain(replicas.iter()) {
            if endpoint.addr.is_empty() {
                return Err(RegistryError::EmptyAddress {
                    role: endpoint.label.clone(),
                });
            }
            if !seen.insert(endpoint.addr.as_str()) {
                return Err(RegistryError::DuplicateAddress {
                    addr: endpoint.addr.clone(),
                });
            }
        }

        Ok(Self { primary, replicas })
    }

    /// Build a registry from the `[cluster]` config section.
    pub fn from_config(cluster: &ClusterConfig) -> Result<Self, RegistryError> {
        Self::new(cluster.primary.as_str(), cluster.replicas.iter().map(String::as_str))
    }

    pub fn primary(&self) -> &BackendEndpoint {
        &self.primary
    }

    /// Replicas in registry order. Never empty.
    pub fn replicas(&self) -> &[BackendEndpoint] {
        &self.replicas
    }

    pub fn replica(&self, index: usize) -> Option<&BackendEndpoint> {
        self.replicas.get(index)
    }

    /// Primary first, then replicas in order.
    pub fn endpoints(&self) -> impl Iterator<Item = &BackendEndpoint> {
        std::iter::once(&self.primary).chain(self.replicas.iter())
    }

    /// Look up an endpoint by its label.
    pub fn find(&self, label: &str) -> Option<&BackendEndpoint> {
        self.endpoints().find(|e| e.label == label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_registry() -> BackendRegistry {
        BackendRegistry::new("10.0.0.1:5432", ["10.0.0.2:5432", "10.0.0.3:5432"]).unwrap()
    }

    #[test]
    fn test_labels_follow_roles() {
        let registry = create_test_registry();
        assert_eq!(registry.primary().label(), "primary");
        assert_eq!(registry.replicas()[0].label(), "replica-0");
        assert_eq!(registry.replicas()[1].label(), "replica-1");
        assert!(registry.primary().is_primary());
        assert!(!registry.replicas()[0].is_primary());
    }

    #[test]
    fn test_replica_order_is_preserved() {
        let registry = create_test_registry();
        assert_eq!(registry.replica(0).unwrap().addr(), "10.0.0.2:5432");
        assert_eq!(registry.replica(1).unwrap().addr(), "10.0.0.3:5432");
        assert!(registry.replica(2).is_none());
    }

    #[test]
    fn test_endpoints_and_find() {
        let registry = create_test_registry();
        let labels: Vec<&str> = registry.endpoints().map(|e| e.label()).collect();
        assert_eq!(labels, vec!["primary", "replica-0", "replica-1"]);
        assert_eq!(
            registry.find("replica-1").map(|e| e.addr()),
            Some("10.0.0.3:5432")
        );
        assert!(registry.find("replica-9").is_none());
    }

    #[test]
    fn test_empty_replicas_fails() {
        let replicas: Vec<String> = Vec::new();
        assert_eq!(
            BackendRegistry::new("10.0.0.1:5432", replicas).unwrap_err(),
            RegistryError::NoReplicas
        );
    }

    #[test]
    fn test_primary_and_replicas_must_be_disjoint() {
        let err = BackendRegistry::new("10.0.0.1:5432", ["10.0.0.1:5432"]).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateAddress { .. }));
    }

    #[test]
    fn test_duplicate_replicas_fail() {
        let err =
            BackendRegistry::new("10.0.0.1:5432", ["10.0.0.2:5432", " 10.0.0.2:5432"]).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateAddress { .. }));
    }

    #[test]
    fn test_blank_address_fails() {
        let err = BackendRegistry::new("10.0.0.1:5432", ["  "]).unwrap_err();
        assert_eq!(
            err,
            RegistryError::EmptyAddress {
                role: "replica-0".to_string()
            }
        );
    }

    #[test]
    fn test_from_config() {
        let cluster = ClusterConfig {
            primary: "10.0.0.1:5432".to_string(),
            replicas: vec!["10.0.0.2:5432".to_string(), "10.0.0.3:5432".to_string()],
        };
        let registry = BackendRegistry::from_config(&cluster).unwrap();
        assert_eq!(registry.replicas().len(), 2);
    }

    #[test]
    fn test_empty_cluster_config_fails() {
        assert_eq!(
            BackendRegistry::from_config(&ClusterConfig::default()).unwrap_err(),
            RegistryError::NoReplicas
        );
    }
}
