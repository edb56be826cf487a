//! Runtime client abstraction.
//!
//! These traits are the seam between execution orchestration and a concrete
//! container runtime, so the orchestrator can be driven by Docker in
//! production and by recording mocks in tests.

use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::spec::{ContainerHandle, HostSpec, NetworkSpec, ProcessSpec};
use async_trait::async_trait;
use bytes::Bytes;

/// A connection to one endpoint's container runtime.
#[async_trait]
pub trait RuntimeClient: Send + Sync {
    /// Create (but do not start) a container.
    ///
    /// # Returns
    /// The runtime-issued handle of the new container.
    async fn create(
        &self,
        process: &ProcessSpec,
        host: &HostSpec,
        network: &NetworkSpec,
        name: Option<&str>,
    ) -> Result<ContainerHandle>;

    /// Extract a tar archive into `dest_dir` inside the container.
    async fn inject_archive(
        &self,
        handle: &ContainerHandle,
        dest_dir: &str,
        archive: Bytes,
    ) -> Result<()>;

    /// Start a created container.
    async fn start(&self, handle: &ContainerHandle) -> Result<()>;

    /// Force-remove a container, stopping it first if needed.
    async fn remove(&self, handle: &ContainerHandle) -> Result<()>;

    /// Check whether an image is present on the endpoint.
    async fn image_exists(&self, image: &str) -> Result<bool>;

    /// Pull an image onto the endpoint, waiting for completion.
    async fn pull_image(&self, image: &str) -> Result<()>;

    /// Release the connection. Consumes the client so it cannot be used afterwards.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Produces connected runtime clients for endpoints.
#[async_trait]
pub trait ClientProvider: Send + Sync {
    /// Connect to the runtime of the given endpoint.
    ///
    /// # Errors
    /// Returns an error if the endpoint address is unsupported or unreachable.
    async fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn RuntimeClient>>;
}
