//! Query classification and read/write backend selection.
//!
//! Provides the routing engine with hot-swappable read policies and the
//! per-backend hit counters it feeds.

pub mod classifier;
mod engine;
mod mode;
pub mod probe;
mod stats;

pub use classifier::{classify, QueryClassification};
pub use engine::{RoutingEngine, StatsReport};
pub use mode::{ModeCell, RoutingMode};
pub use probe::{ProbeResult, Prober, TcpProber};
pub use stats::StatsCollector;
