//! Executor - runs a script on an endpoint inside an ephemeral container.
//!
//! One invocation walks a fixed sequence of stages against a single runtime
//! client:
//!
//! ```text
//! lookup -> authorize -> pack -> connect -> [pull] -> create -> inject -> start
//! ```
//!
//! Every stage runs at most once and the first failure ends the sequence.
//! The client is closed on every path once connected.

use crate::archive::{Archive, ScriptPayload};
use crate::auth::{Authorizer, Principal};
use crate::config::{CleanupPolicy, ExecutorConfig, ImagePolicy};
use crate::error::{ExecError, Result, Stage};
use crate::registry::EndpointRegistry;
use crate::spec_builder::SpecBuilder;
use chrono::{DateTime, Utc};
use hostexec_runtime::{
    ClientProvider, ContainerHandle, Endpoint, EndpointId, HostSpec, ProcessSpec, RuntimeClient,
};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Label present on every execution container.
pub const LABEL_COMMAND: &str = "io.hostexec.command";

/// Label carrying the execution ID.
pub const LABEL_EXECUTION: &str = "io.hostexec.execution";

/// Label carrying the endpoint ID.
pub const LABEL_ENDPOINT: &str = "io.hostexec.endpoint";

/// Unique identifier for one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExecutionId(Uuid);

impl ExecutionId {
    /// Create a new random execution ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ExecutionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ExecutionId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// A request to run a script on an endpoint.
#[derive(Debug, Clone)]
pub struct ExecRequest {
    /// Target endpoint.
    pub endpoint_id: EndpointId,
    /// Script to run.
    pub script: ScriptPayload,
    /// Caller identity, checked against the authorizer.
    pub principal: Principal,
}

impl ExecRequest {
    /// Create a request.
    pub fn new(endpoint_id: EndpointId, script: ScriptPayload, principal: Principal) -> Self {
        Self {
            endpoint_id,
            script,
            principal,
        }
    }
}

/// Outcome of a successful execution.
///
/// The container keeps running after this is returned; the handle is what
/// later cleanup tooling needs.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    /// Execution ID, also written to the container's labels.
    pub execution_id: ExecutionId,
    /// Endpoint the container runs on.
    pub endpoint_id: EndpointId,
    /// The started container.
    pub container: ContainerHandle,
    /// When the container was started.
    pub started_at: DateTime<Utc>,
}

/// Runs scripts on endpoints in ephemeral privileged containers.
///
/// The executor holds no per-execution state and is safe to share across
/// tasks behind an `Arc`.
pub struct Executor {
    registry: Arc<dyn EndpointRegistry>,
    authorizer: Arc<dyn Authorizer>,
    provider: Arc<dyn ClientProvider>,
    specs: SpecBuilder,
    cleanup: CleanupPolicy,
    image_policy: ImagePolicy,
}

impl Executor {
    /// Create a new executor.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if the execution environment does not validate.
    pub fn new(
        registry: Arc<dyn EndpointRegistry>,
        authorizer: Arc<dyn Authorizer>,
        provider: Arc<dyn ClientProvider>,
        config: ExecutorConfig,
    ) -> Result<Self> {
        config.environment.validate()?;
        tracing::info!(
            image = %config.environment.image,
            network_mode = %config.environment.network_mode,
            cleanup = ?config.cleanup,
            image_policy = ?config.image_policy,
            "Creating executor"
        );
        Ok(Self {
            registry,
            authorizer,
            provider,
            specs: SpecBuilder::new(config.environment),
            cleanup: config.cleanup,
            image_policy: config.image_policy,
        })
    }

    /// Get the spec builder containers are derived from.
    pub fn specs(&self) -> &SpecBuilder {
        &self.specs
    }

    /// Run a script on an endpoint.
    ///
    /// # Returns
    ///
    /// A report identifying the started container.
    ///
    /// # Errors
    ///
    /// - `NotFound` / `Lookup` if the endpoint cannot be resolved
    /// - `AccessDenied` if the authorizer rejects the principal
    /// - `Connection` if no runtime client can be created
    /// - `Runtime` tagged with the failed stage otherwise
    pub async fn execute(&self, request: ExecRequest) -> Result<ExecutionReport> {
        let execution_id = ExecutionId::new();
        let start = std::time::Instant::now();
        tracing::info!(
            execution_id = %execution_id,
            endpoint_id = %request.endpoint_id,
            script_len = request.script.len(),
            "Executing script"
        );

        let endpoint = self.registry.endpoint(request.endpoint_id).await?;

        if let Err(e) = self
            .authorizer
            .authorize(&request.principal, &endpoint)
            .await
        {
            tracing::warn!(
                execution_id = %execution_id,
                endpoint_id = %endpoint.id,
                error = %e,
                "Access to endpoint denied"
            );
            return Err(e);
        }

        let archive = request
            .script
            .to_archive()
            .map_err(|e| ExecError::runtime(Stage::Archive, e))?;

        let process = self
            .specs
            .process_spec(&self.specs.script_path(), self.labels(execution_id, &endpoint));
        let host = self.specs.host_spec();

        let client = self.provider.connect(&endpoint).await.map_err(|source| {
            tracing::error!(endpoint_id = %endpoint.id, error = %source, "Failed to connect to endpoint");
            ExecError::Connection {
                endpoint: endpoint.id,
                source,
            }
        })?;
        tracing::debug!(execution_id = %execution_id, endpoint_id = %endpoint.id, "Runtime client connected");

        let outcome = self
            .provision(client.as_ref(), execution_id, &process, &host, archive)
            .await;

        if let Err(e) = client.close().await {
            tracing::warn!(endpoint_id = %endpoint.id, error = %e, "Failed to close runtime client");
        }

        let container = outcome?;
        tracing::info!(
            execution_id = %execution_id,
            endpoint_id = %endpoint.id,
            container_id = %container,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Script container started"
        );

        Ok(ExecutionReport {
            execution_id,
            endpoint_id: endpoint.id,
            container,
            started_at: Utc::now(),
        })
    }

    /// Identification labels for one execution container.
    fn labels(&self, execution_id: ExecutionId, endpoint: &Endpoint) -> BTreeMap<String, String> {
        BTreeMap::from([
            (LABEL_COMMAND.to_string(), "true".to_string()),
            (LABEL_EXECUTION.to_string(), execution_id.to_string()),
            (LABEL_ENDPOINT.to_string(), endpoint.id.to_string()),
        ])
    }

    /// Pull (if configured), create, inject and start.
    async fn provision(
        &self,
        client: &dyn RuntimeClient,
        execution_id: ExecutionId,
        process: &ProcessSpec,
        host: &HostSpec,
        archive: Archive,
    ) -> Result<ContainerHandle> {
        if self.image_policy == ImagePolicy::PullIfMissing {
            self.ensure_image(client, &process.image).await?;
        }

        let handle = client
            .create(process, host, &self.specs.network_spec(), None)
            .await
            .map_err(|e| {
                tracing::error!(execution_id = %execution_id, image = %process.image, error = %e, "Container creation failed");
                ExecError::runtime(Stage::Create, e)
            })?;
        tracing::debug!(execution_id = %execution_id, container_id = %handle, "Container created");

        if let Err(e) = self.populate_and_start(client, &handle, archive).await {
            tracing::error!(
                execution_id = %execution_id,
                container_id = %handle,
                error = %e,
                "Container provisioning failed after create"
            );
            self.release(client, &handle).await;
            return Err(e);
        }

        Ok(handle)
    }

    /// Copy the script archive into the container, then start it.
    async fn populate_and_start(
        &self,
        client: &dyn RuntimeClient,
        handle: &ContainerHandle,
        archive: Archive,
    ) -> Result<()> {
        let archive_len = archive.len();
        client
            .inject_archive(handle, self.specs.script_dir(), archive.into_bytes())
            .await
            .map_err(|e| ExecError::runtime(Stage::Inject, e))?;
        tracing::debug!(container_id = %handle, archive_len, dest = %self.specs.script_dir(), "Archive injected");

        client
            .start(handle)
            .await
            .map_err(|e| ExecError::runtime(Stage::Start, e))?;
        Ok(())
    }

    /// Apply the cleanup policy to a container whose provisioning failed.
    ///
    /// Removal errors are logged and never replace the original failure.
    async fn release(&self, client: &dyn RuntimeClient, handle: &ContainerHandle) {
        match self.cleanup {
            CleanupPolicy::Preserve => {
                tracing::warn!(container_id = %handle, "Preserving failed container for diagnostics");
            }
            CleanupPolicy::RemoveOnFailure => {
                tracing::debug!(container_id = %handle, "Removing failed container");
                if let Err(e) = client.remove(handle).await {
                    tracing::warn!(container_id = %handle, error = %e, "Failed to remove container");
                }
            }
        }
    }

    /// Pull the image if the endpoint does not have it.
    async fn ensure_image(&self, client: &dyn RuntimeClient, image: &str) -> Result<()> {
        let present = client
            .image_exists(image)
            .await
            .map_err(|e| ExecError::runtime(Stage::Pull, e))?;
        if present {
            tracing::trace!(image, "Image already present");
            return Ok(());
        }

        tracing::info!(image, "Image missing on endpoint, pulling");
        client
            .pull_image(image)
            .await
            .map_err(|e| ExecError::runtime(Stage::Pull, e))
    }
}
