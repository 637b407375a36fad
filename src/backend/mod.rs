//! Cluster topology and statement execution.
//!
//! The registry is the fixed addressing scheme every other component
//! uses; the executor runs statements on whichever endpoint routing picked.

mod executor;
mod registry;

pub use executor::{PgExecutor, QueryExecutor, QueryResponse, Row};
pub use registry::{BackendEndpoint, BackendRegistry, BackendRole, RegistryError};
