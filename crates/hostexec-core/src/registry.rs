//! Endpoint registry lookup.

use crate::error::ExecError;
use async_trait::async_trait;
use hostexec_runtime::{Endpoint, EndpointId};
use std::collections::HashMap;
use thiserror::Error;

/// Failure looking up an endpoint.
#[derive(Debug, Error)]
pub enum LookupError {
    /// No endpoint has this ID.
    #[error("endpoint not found: {0}")]
    NotFound(EndpointId),

    /// The registry itself failed.
    #[error("registry error: {0}")]
    Backend(String),
}

impl From<LookupError> for ExecError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::NotFound(id) => ExecError::NotFound(id),
            LookupError::Backend(message) => ExecError::Lookup(message),
        }
    }
}

/// Resolves endpoint IDs to endpoint descriptors.
#[async_trait]
pub trait EndpointRegistry: Send + Sync {
    /// Look up an endpoint.
    ///
    /// # Errors
    /// `LookupError::NotFound` if no endpoint has this ID, `LookupError::Backend`
    /// for any other failure.
    async fn endpoint(&self, id: EndpointId) -> Result<Endpoint, LookupError>;
}

/// Fixed in-memory registry, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    endpoints: HashMap<EndpointId, Endpoint>,
}

impl StaticRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an endpoint, replacing any previous one with the same ID.
    pub fn insert(&mut self, endpoint: Endpoint) {
        self.endpoints.insert(endpoint.id, endpoint);
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.insert(endpoint);
        self
    }

    /// Number of registered endpoints.
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// True if no endpoints are registered.
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

impl FromIterator<Endpoint> for StaticRegistry {
    fn from_iter<I: IntoIterator<Item = Endpoint>>(iter: I) -> Self {
        let mut registry = Self::new();
        for endpoint in iter {
            registry.insert(endpoint);
        }
        registry
    }
}

#[async_trait]
impl EndpointRegistry for StaticRegistry {
    async fn endpoint(&self, id: EndpointId) -> Result<Endpoint, LookupError> {
        self.endpoints
            .get(&id)
            .cloned()
            .ok_or(LookupError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_registry_lookup() {
        let registry = StaticRegistry::new()
            .with_endpoint(Endpoint::new(1, "local", "unix:///var/run/docker.sock"));

        let endpoint = registry.endpoint(EndpointId::new(1)).await.unwrap();
        assert_eq!(endpoint.name, "local");

        let err = registry.endpoint(EndpointId::new(2)).await.unwrap_err();
        assert!(matches!(err, LookupError::NotFound(id) if id == EndpointId::new(2)));
    }

    #[test]
    fn test_from_iter_replaces_duplicates() {
        let registry: StaticRegistry = vec![
            Endpoint::new(1, "old", "local"),
            Endpoint::new(1, "new", "local"),
            Endpoint::new(2, "other", "tcp://10.0.0.2:2375"),
        ]
        .into_iter()
        .collect();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_lookup_error_conversion() {
        let err: ExecError = LookupError::NotFound(EndpointId::new(3)).into();
        assert!(err.is_not_found());

        let err: ExecError = LookupError::Backend("database locked".into()).into();
        assert!(matches!(err, ExecError::Lookup(ref m) if m == "database locked"));
    }
}
