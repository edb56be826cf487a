//! Docker implementation of the runtime client using bollard.

use crate::client::{ClientProvider, RuntimeClient};
use crate::endpoint::Endpoint;
use crate::error::{Result, RuntimeError};
use crate::spec::{ContainerHandle, HostSpec, NetworkSpec, ProcessSpec};
use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, NetworkingConfig, RemoveContainerOptions,
    StartContainerOptions, UploadToContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::models::{EndpointSettings, HostConfig};
use bollard::{Docker, API_DEFAULT_VERSION};
use bytes::Bytes;
use futures::TryStreamExt;
use std::collections::HashMap;

/// Default per-request timeout of the Docker client, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Connects to Docker endpoints over a Unix socket or plain TCP.
#[derive(Debug, Clone)]
pub struct DockerProvider {
    request_timeout_secs: u64,
}

impl Default for DockerProvider {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT_SECS)
    }
}

impl DockerProvider {
    /// Create a provider whose clients use the given per-request timeout.
    pub fn new(request_timeout_secs: u64) -> Self {
        Self {
            request_timeout_secs,
        }
    }

    /// Build a bollard client for an endpoint URL without contacting it.
    fn docker_for(&self, url: &str) -> Result<Docker> {
        let url = url.trim();
        let docker = if url.is_empty() || url == "local" {
            Docker::connect_with_local_defaults()?
        } else if url.starts_with("unix://") {
            Docker::connect_with_unix(url, self.request_timeout_secs, API_DEFAULT_VERSION)?
        } else if url.starts_with("tcp://") || url.starts_with("http://") {
            Docker::connect_with_http(url, self.request_timeout_secs, API_DEFAULT_VERSION)?
        } else {
            return Err(RuntimeError::UnsupportedUrl(url.to_string()));
        };
        Ok(docker)
    }
}

#[async_trait]
impl ClientProvider for DockerProvider {
    async fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn RuntimeClient>> {
        tracing::debug!(endpoint_id = %endpoint.id, url = %endpoint.url, "Connecting to Docker endpoint");
        let docker = self.docker_for(&endpoint.url)?;

        // Construction is lazy in bollard; ping so unreachable hosts fail here
        docker.ping().await?;
        tracing::debug!(endpoint_id = %endpoint.id, "Docker endpoint reachable");

        Ok(Box::new(DockerClient::new(docker)))
    }
}

/// A runtime client backed by one bollard connection.
pub struct DockerClient {
    docker: Docker,
}

impl DockerClient {
    /// Wrap an existing bollard connection.
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }
}

/// Translate our specs into a bollard container config.
pub(crate) fn container_config(
    process: &ProcessSpec,
    host: &HostSpec,
    network: &NetworkSpec,
) -> Config<String> {
    let host_config = HostConfig {
        binds: Some(host.binds()),
        network_mode: Some(host.network_mode().to_string()),
        privileged: Some(host.privileged()),
        ..Default::default()
    };

    let networking_config = if network.networks.is_empty() {
        None
    } else {
        Some(NetworkingConfig {
            endpoints_config: network
                .networks
                .iter()
                .map(|name| (name.clone(), EndpointSettings::default()))
                .collect::<HashMap<_, _>>(),
        })
    };

    Config {
        image: Some(process.image.clone()),
        working_dir: Some(process.working_dir.clone()),
        cmd: Some(process.command.clone()),
        attach_stdin: Some(process.attach_stdin),
        attach_stdout: Some(process.attach_stdout),
        attach_stderr: Some(process.attach_stderr),
        tty: Some(process.tty),
        labels: Some(
            process
                .labels
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ),
        host_config: Some(host_config),
        networking_config,
        ..Default::default()
    }
}

/// Whether a Docker error is a 404 about a missing image.
fn is_missing_image(err: &bollard::errors::Error) -> bool {
    match err {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } => *status_code == 404 && message.to_lowercase().contains("image"),
        _ => false,
    }
}

#[async_trait]
impl RuntimeClient for DockerClient {
    async fn create(
        &self,
        process: &ProcessSpec,
        host: &HostSpec,
        network: &NetworkSpec,
        name: Option<&str>,
    ) -> Result<ContainerHandle> {
        let options = name.map(|name| CreateContainerOptions {
            name: name.to_string(),
            platform: None,
        });
        let config = container_config(process, host, network);

        let response = self
            .docker
            .create_container(options, config)
            .await
            .map_err(|e| {
                if is_missing_image(&e) {
                    RuntimeError::ImageNotFound(process.image.clone())
                } else {
                    RuntimeError::Docker(e)
                }
            })?;

        for warning in &response.warnings {
            tracing::warn!(container_id = %response.id, warning = %warning, "Docker create warning");
        }
        Ok(ContainerHandle::new(response.id))
    }

    async fn inject_archive(
        &self,
        handle: &ContainerHandle,
        dest_dir: &str,
        archive: Bytes,
    ) -> Result<()> {
        tracing::trace!(container_id = %handle, dest_dir, size = archive.len(), "Uploading archive");
        let options = UploadToContainerOptions {
            path: dest_dir.to_string(),
            ..Default::default()
        };
        self.docker
            .upload_to_container(handle.as_str(), Some(options), archive)
            .await?;
        Ok(())
    }

    async fn start(&self, handle: &ContainerHandle) -> Result<()> {
        self.docker
            .start_container(handle.as_str(), None::<StartContainerOptions<String>>)
            .await?;
        Ok(())
    }

    async fn remove(&self, handle: &ContainerHandle) -> Result<()> {
        let options = RemoveContainerOptions {
            force: true,
            v: true,
            ..Default::default()
        };
        self.docker
            .remove_container(handle.as_str(), Some(options))
            .await?;
        Ok(())
    }

    async fn image_exists(&self, image: &str) -> Result<bool> {
        match self.docker.inspect_image(image).await {
            Ok(_) => Ok(true),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn pull_image(&self, image: &str) -> Result<()> {
        tracing::info!(image, "Pulling image");
        let options = CreateImageOptions {
            from_image: image.to_string(),
            ..Default::default()
        };
        let progress: Vec<_> = self
            .docker
            .create_image(Some(options), None, None)
            .try_collect()
            .await?;
        tracing::debug!(image, events = progress.len(), "Image pull complete");
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        // bollard releases its connection pool on drop
        drop(self.docker);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::BindMount;
    use std::collections::BTreeMap;

    fn process_spec() -> ProcessSpec {
        let mut labels = BTreeMap::new();
        labels.insert("io.hostexec.command".to_string(), "true".to_string());
        ProcessSpec {
            image: "ubuntu:14.04".into(),
            working_dir: "/tmp".into(),
            command: vec!["/tmp/script.sh".into()],
            attach_stdin: true,
            attach_stdout: true,
            attach_stderr: true,
            tty: true,
            labels,
        }
    }

    fn host_spec() -> HostSpec {
        HostSpec::privileged_host(
            vec![
                BindMount::read_write("/", "/host"),
                BindMount::read_only("/etc", "/etc"),
            ],
            "host",
        )
    }

    #[test]
    fn test_container_config_mapping() {
        let config = container_config(&process_spec(), &host_spec(), &NetworkSpec::default());

        assert_eq!(config.image.as_deref(), Some("ubuntu:14.04"));
        assert_eq!(config.working_dir.as_deref(), Some("/tmp"));
        assert_eq!(config.cmd, Some(vec!["/tmp/script.sh".to_string()]));
        assert_eq!(config.tty, Some(true));
        assert_eq!(config.attach_stdin, Some(true));
        assert!(config.networking_config.is_none());

        let labels = config.labels.expect("labels set");
        assert_eq!(labels.get("io.hostexec.command").map(String::as_str), Some("true"));

        let host = config.host_config.expect("host config set");
        assert_eq!(host.privileged, Some(true));
        assert_eq!(host.network_mode.as_deref(), Some("host"));
        assert_eq!(
            host.binds,
            Some(vec!["/:/host".to_string(), "/etc:/etc:ro".to_string()])
        );
    }

    #[test]
    fn test_container_config_networks() {
        let network = NetworkSpec {
            networks: vec!["ops".into()],
        };
        let config = container_config(&process_spec(), &host_spec(), &network);
        let networking = config.networking_config.expect("networking config set");
        assert!(networking.endpoints_config.contains_key("ops"));
    }

    #[test]
    fn test_is_missing_image() {
        let err = bollard::errors::Error::DockerResponseServerError {
            status_code: 404,
            message: "No such image: ubuntu:14.04".into(),
        };
        assert!(is_missing_image(&err));

        let err = bollard::errors::Error::DockerResponseServerError {
            status_code: 500,
            message: "No such image: ubuntu:14.04".into(),
        };
        assert!(!is_missing_image(&err));
    }

    #[test]
    fn test_unsupported_url() {
        let provider = DockerProvider::default();
        let result = provider.docker_for("ftp://example.com");
        assert!(matches!(result, Err(RuntimeError::UnsupportedUrl(_))));
    }

    #[test]
    fn test_connect_unsupported_url() {
        let provider = DockerProvider::new(5);
        let endpoint = Endpoint::new(1, "bad", "ssh://host");
        let result = tokio_test::block_on(provider.connect(&endpoint));
        assert!(matches!(result, Err(RuntimeError::UnsupportedUrl(_))));
    }

    #[tokio::test]
    async fn test_unix_and_tcp_urls_build_clients() {
        let provider = DockerProvider::default();
        assert!(provider.docker_for("unix:///var/run/docker.sock").is_ok());
        assert!(provider.docker_for("tcp://10.0.0.2:2375").is_ok());
    }
}
