//! # hostexec-core
//!
//! Ad-hoc script execution on remote Docker endpoints.
//!
//! A script is packed into a tar archive, a privileged container is created on
//! the endpoint, the archive is copied into it and the container is started so
//! the script runs with administrative access to the host.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    hostexec-core                         │
//! ├──────────────────────────────────────────────────────────┤
//! │                                                          │
//! │  ┌─────────────────┐     ┌──────────────────────────┐    │
//! │  │    Executor     │────▶│  EndpointRegistry        │    │
//! │  │   - execute()   │     │  Authorizer              │    │
//! │  └─────────────────┘     └──────────────────────────┘    │
//! │      │         │                                         │
//! │      ▼         ▼                                         │
//! │  ┌──────────┐ ┌──────────────┐                           │
//! │  │  pack()  │ │ SpecBuilder  │◀── ExecEnvironment        │
//! │  └──────────┘ └──────────────┘                           │
//! │      │         │                                         │
//! │      ▼         ▼                                         │
//! │  ┌──────────────────────────────────────────────────┐    │
//! │  │ RuntimeClient (hostexec-runtime)                 │    │
//! │  │   create -> inject_archive -> start, then close  │    │
//! │  └──────────────────────────────────────────────────┘    │
//! │                                                          │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use hostexec_core::{
//!     AllowAll, ExecRequest, Executor, ExecutorConfig, Principal, ScriptPayload, StaticRegistry,
//! };
//! use hostexec_runtime::{DockerProvider, Endpoint, EndpointId};
//! use std::sync::Arc;
//!
//! # async fn example() -> hostexec_core::Result<()> {
//! let registry = StaticRegistry::new()
//!     .with_endpoint(Endpoint::new(1, "local", "unix:///var/run/docker.sock"));
//!
//! let executor = Executor::new(
//!     Arc::new(registry),
//!     Arc::new(AllowAll),
//!     Arc::new(DockerProvider::default()),
//!     ExecutorConfig::default(),
//! )?;
//!
//! let report = executor
//!     .execute(ExecRequest::new(
//!         EndpointId::new(1),
//!         ScriptPayload::new(&b"#!/bin/sh\necho hi\n"[..]),
//!         Principal::Anonymous,
//!     ))
//!     .await?;
//! println!("started container {}", report.container);
//! # Ok(())
//! # }
//! ```

mod archive;
mod auth;
mod config;
mod error;
mod executor;
mod registry;
mod spec_builder;

pub use archive::{pack, Archive, ArchiveEntry, ScriptPayload, SCRIPT_MODE, SCRIPT_NAME};
pub use auth::{AllowAll, Authorizer, EndpointScope, Principal, TokenAuthorizer};
pub use config::{
    default_mounts, CleanupPolicy, ExecEnvironment, ExecEnvironmentBuilder, ExecutorConfig,
    ImagePolicy, DEFAULT_IMAGE, DEFAULT_NETWORK_MODE, DEFAULT_SCRIPT_DIR, HOST_ROOT_TARGET,
};
pub use error::{ExecError, Result, Stage, StatusClass};
pub use executor::{
    ExecRequest, ExecutionId, ExecutionReport, Executor, LABEL_COMMAND, LABEL_ENDPOINT,
    LABEL_EXECUTION,
};
pub use registry::{EndpointRegistry, LookupError, StaticRegistry};
pub use spec_builder::SpecBuilder;
