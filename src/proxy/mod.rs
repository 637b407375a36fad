//! The internal routing proxy and the HTTP plumbing shared with the gate.

mod connection;
pub mod health;
mod router;
pub mod server;
mod service;
pub mod shutdown;
pub mod types;

pub(crate) use router::json_body;
pub use router::build_router;
pub use server::{HttpServer, ServerHandle};
pub use service::ProxyService;
