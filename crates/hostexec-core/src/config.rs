//! Execution environment and executor configuration types.

use crate::error::ExecError;
use hostexec_runtime::BindMount;
use std::collections::BTreeMap;

/// Default image execution containers are created from.
pub const DEFAULT_IMAGE: &str = "ubuntu:14.04";

/// Default directory the script is copied into, also the working directory.
pub const DEFAULT_SCRIPT_DIR: &str = "/tmp";

/// Default network mode of execution containers.
pub const DEFAULT_NETWORK_MODE: &str = "host";

/// Container-side path the host root filesystem is bound to.
pub const HOST_ROOT_TARGET: &str = "/host";

/// The container environment scripts are executed in.
///
/// Every container created by the executor is derived from this value alone;
/// nothing varies per request except labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecEnvironment {
    /// Image reference.
    pub image: String,
    /// Absolute directory the script is copied into.
    pub script_dir: String,
    /// Host paths bound into the container.
    pub mounts: Vec<BindMount>,
    /// Network mode (default: `host`).
    pub network_mode: String,
    /// Additional networks to attach at creation.
    pub networks: Vec<String>,
    /// Static labels added to every execution container.
    pub labels: BTreeMap<String, String>,
}

impl Default for ExecEnvironment {
    fn default() -> Self {
        Self {
            image: DEFAULT_IMAGE.to_string(),
            script_dir: DEFAULT_SCRIPT_DIR.to_string(),
            mounts: default_mounts(),
            network_mode: DEFAULT_NETWORK_MODE.to_string(),
            networks: Vec::new(),
            labels: BTreeMap::new(),
        }
    }
}

/// Host root read-write at `/host`, host `/etc` read-only at `/etc`.
pub fn default_mounts() -> Vec<BindMount> {
    vec![
        BindMount::read_write("/", HOST_ROOT_TARGET),
        BindMount::read_only("/etc", "/etc"),
    ]
}

impl ExecEnvironment {
    /// Create a new environment builder starting from the defaults.
    pub fn builder() -> ExecEnvironmentBuilder {
        ExecEnvironmentBuilder::default()
    }

    /// Validate the environment.
    pub fn validate(&self) -> Result<(), ExecError> {
        if self.image.trim().is_empty() {
            return Err(ExecError::InvalidConfig("image is required".into()));
        }
        if !self.script_dir.starts_with('/') {
            return Err(ExecError::InvalidConfig(format!(
                "script_dir must be absolute, got {:?}",
                self.script_dir
            )));
        }
        if self.network_mode.trim().is_empty() {
            return Err(ExecError::InvalidConfig("network_mode is required".into()));
        }
        for mount in &self.mounts {
            if !mount.source.starts_with('/') || !mount.target.starts_with('/') {
                return Err(ExecError::InvalidConfig(format!(
                    "bind mount paths must be absolute: {}",
                    mount.to_bind_string()
                )));
            }
        }
        Ok(())
    }
}

/// Builder for ExecEnvironment.
#[derive(Debug, Default)]
pub struct ExecEnvironmentBuilder {
    env: ExecEnvironment,
}

impl ExecEnvironmentBuilder {
    /// Set the image reference.
    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.env.image = image.into();
        self
    }

    /// Set the directory the script is copied into.
    pub fn script_dir(mut self, dir: impl Into<String>) -> Self {
        self.env.script_dir = dir.into();
        self
    }

    /// Replace the bind mount set.
    pub fn mounts(mut self, mounts: Vec<BindMount>) -> Self {
        self.env.mounts = mounts;
        self
    }

    /// Append a bind mount.
    pub fn mount(mut self, mount: BindMount) -> Self {
        self.env.mounts.push(mount);
        self
    }

    /// Set the network mode.
    pub fn network_mode(mut self, mode: impl Into<String>) -> Self {
        self.env.network_mode = mode.into();
        self
    }

    /// Attach an additional network.
    pub fn network(mut self, name: impl Into<String>) -> Self {
        self.env.networks.push(name.into());
        self
    }

    /// Add a static label.
    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.labels.insert(key.into(), value.into());
        self
    }

    /// Build the environment, validating all fields.
    pub fn build(self) -> Result<ExecEnvironment, ExecError> {
        self.env.validate()?;
        Ok(self.env)
    }
}

/// What to do with a created container when a later stage fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CleanupPolicy {
    /// Force-remove it, best effort (default).
    #[default]
    RemoveOnFailure,
    /// Leave it in place for diagnostics.
    Preserve,
}

impl CleanupPolicy {
    /// Parse from string (case-insensitive).
    ///
    /// Returns `None` for unrecognised values.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "remove" | "remove-on-failure" => Some(Self::RemoveOnFailure),
            "preserve" | "keep" => Some(Self::Preserve),
            _ => None,
        }
    }
}

/// Whether the executor provisions the image before creating a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImagePolicy {
    /// The image must already be present; a missing image fails at create (default).
    #[default]
    Require,
    /// Pull the image first if the endpoint does not have it.
    PullIfMissing,
}

/// Configuration for the Executor.
#[derive(Debug, Clone, Default)]
pub struct ExecutorConfig {
    /// Container environment.
    pub environment: ExecEnvironment,
    /// Cleanup behavior on partial failure.
    pub cleanup: CleanupPolicy,
    /// Image provisioning behavior.
    pub image_policy: ImagePolicy,
}

impl ExecutorConfig {
    /// Create a configuration for the given environment with default policies.
    pub fn new(environment: ExecEnvironment) -> Self {
        Self {
            environment,
            ..Default::default()
        }
    }

    /// Set the cleanup policy.
    pub fn with_cleanup(mut self, cleanup: CleanupPolicy) -> Self {
        self.cleanup = cleanup;
        self
    }

    /// Set the image policy.
    pub fn with_image_policy(mut self, policy: ImagePolicy) -> Self {
        self.image_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_defaults() {
        let env = ExecEnvironment::default();
        assert_eq!(env.image, "ubuntu:14.04");
        assert_eq!(env.script_dir, "/tmp");
        assert_eq!(env.network_mode, "host");
        assert_eq!(env.mounts, default_mounts());
        assert!(env.networks.is_empty());
        assert!(env.validate().is_ok());
    }

    #[test]
    fn test_default_mounts() {
        let mounts = default_mounts();
        assert_eq!(mounts.len(), 2);
        assert_eq!(mounts[0], BindMount::read_write("/", "/host"));
        assert_eq!(mounts[1], BindMount::read_only("/etc", "/etc"));
    }

    #[test]
    fn test_builder_success() {
        let env = ExecEnvironment::builder()
            .image("alpine:3")
            .script_dir("/opt/run")
            .mount(BindMount::read_only("/var/log", "/var/log"))
            .network("ops")
            .label("team", "infra")
            .build()
            .expect("should build successfully");

        assert_eq!(env.image, "alpine:3");
        assert_eq!(env.script_dir, "/opt/run");
        assert_eq!(env.mounts.len(), 3);
        assert_eq!(env.networks, vec!["ops".to_string()]);
        assert_eq!(env.labels.get("team").map(String::as_str), Some("infra"));
    }

    #[test]
    fn test_builder_validation_empty_image() {
        let result = ExecEnvironment::builder().image("  ").build();
        assert!(matches!(result, Err(ExecError::InvalidConfig(_))));
    }

    #[test]
    fn test_builder_validation_relative_dir() {
        let result = ExecEnvironment::builder().script_dir("tmp").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_validation_relative_mount() {
        let result = ExecEnvironment::builder()
            .mount(BindMount::read_only("etc", "/etc"))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_cleanup_policy_parsing() {
        assert_eq!(CleanupPolicy::parse("preserve"), Some(CleanupPolicy::Preserve));
        assert_eq!(CleanupPolicy::parse("KEEP"), Some(CleanupPolicy::Preserve));
        assert_eq!(CleanupPolicy::parse(" remove "), Some(CleanupPolicy::RemoveOnFailure));
        assert_eq!(CleanupPolicy::parse("preserv"), None);
        assert_eq!(CleanupPolicy::parse(""), None);
    }

    #[test]
    fn test_executor_config_defaults() {
        let config = ExecutorConfig::default();
        assert_eq!(config.cleanup, CleanupPolicy::RemoveOnFailure);
        assert_eq!(config.image_policy, ImagePolicy::Require);

        let config = ExecutorConfig::new(ExecEnvironment::default())
            .with_cleanup(CleanupPolicy::Preserve)
            .with_image_policy(ImagePolicy::PullIfMissing);
        assert_eq!(config.cleanup, CleanupPolicy::Preserve);
        assert_eq!(config.image_policy, ImagePolicy::PullIfMissing);
    }
}
