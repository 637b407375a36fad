//! Read-routing policy and its atomic process-wide slot.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::GateError;

/// Policy used to pick a backend for read queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum RoutingMode {
    /// Every read goes to the primary.
    #[default]
    Direct = 0,
    /// Uniform random replica per read.
    Random = 1,
    /// Replica with the lowest probed connect latency.
    Latency = 2,
}

impl RoutingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutingMode::Direct => "direct",
            RoutingMode::Random => "random",
            RoutingMode::Latency => "latency",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => RoutingMode::Direct,
            1 => RoutingMode::Random,
            _ => RoutingMode::Latency,
        }
    }
}

impl fmt::Display for RoutingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoutingMode {
    type Err = GateError;

    /// Case-insensitive. `custom` is the historical name of `latency`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(RoutingMode::Direct),
            "random" => Ok(RoutingMode::Random),
            "latency" | "custom" => Ok(RoutingMode::Latency),
            _ => Err(GateError::InvalidMode {
                mode: s.to_string(),
            }),
        }
    }
}

impl Serialize for RoutingMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RoutingMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Lock-free holder for the active mode.
///
/// The mode is a single byte, so every load observes a value written in
/// full by some earlier store.
#[derive(Debug)]
pub struct ModeCell(AtomicU8);

impl ModeCell {
    pub fn new(mode: RoutingMode) -> Self {
        Self(AtomicU8::new(mode as u8))
    }

    pub fn load(&self) -> RoutingMode {
        RoutingMode::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Store `mode` and return the previous one.
    pub fn swap(&self, mode: RoutingMode) -> RoutingMode {
        RoutingMode::from_u8(self.0.swap(mode as u8, Ordering::AcqRel))
    }
}
