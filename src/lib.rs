//! Authenticating gate and replica-aware query router for a
//! primary/replica database cluster.

pub mod backend;
pub mod config;
pub mod error;
pub mod gate;
pub mod logging;
pub mod proxy;
pub mod routing;
