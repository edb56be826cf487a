//! Endpoint descriptors: registered remote hosts running a container runtime.

use std::fmt;
use std::str::FromStr;

/// Numeric identifier of a registered endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointId(u64);

impl EndpointId {
    /// Create an endpoint ID.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw numeric value.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EndpointId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl FromStr for EndpointId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(Self)
    }
}

/// A registered host running a Docker-compatible runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Endpoint identifier.
    pub id: EndpointId,
    /// Human-readable name.
    pub name: String,
    /// Runtime address: `unix:///path`, `tcp://host:port`, `http://host:port` or `local`.
    pub url: String,
}

impl Endpoint {
    /// Create a new endpoint descriptor.
    pub fn new(id: impl Into<EndpointId>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
        }
    }
}
