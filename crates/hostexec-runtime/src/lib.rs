//! # hostexec-runtime
//!
//! Container runtime layer for hostexec.
//! Provides the client abstraction the executor drives, and a Docker
//! implementation on top of bollard.
//!
//! ## Quick Start
//!
//! ```no_run
//! use hostexec_runtime::{ClientProvider, DockerProvider, Endpoint};
//!
//! # async fn example() -> hostexec_runtime::Result<()> {
//! let provider = DockerProvider::default();
//! let endpoint = Endpoint::new(1, "local", "unix:///var/run/docker.sock");
//!
//! let client = provider.connect(&endpoint).await?;
//! let present = client.image_exists("ubuntu:14.04").await?;
//! println!("image present: {present}");
//!
//! client.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - **Client Abstraction**: `RuntimeClient` / `ClientProvider` traits
//! - **Container Specs**: process, host and network specs independent of bollard
//! - **Docker Backend**: Unix socket and TCP endpoints via bollard

mod client;
mod docker;
mod endpoint;
mod error;
mod spec;

pub use client::{ClientProvider, RuntimeClient};
pub use docker::{DockerClient, DockerProvider, DEFAULT_REQUEST_TIMEOUT_SECS};
pub use endpoint::{Endpoint, EndpointId};
pub use error::{Result, RuntimeError};
pub use spec::{BindMount, ContainerHandle, HostSpec, NetworkSpec, ProcessSpec};
