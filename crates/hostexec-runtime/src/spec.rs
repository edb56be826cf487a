//! Container specifications passed to the runtime at creation time.

use std::collections::BTreeMap;
use std::fmt;

/// Process-level configuration of a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    /// Image reference (e.g. `ubuntu:14.04`).
    pub image: String,
    /// Working directory of the container process.
    pub working_dir: String,
    /// Command to run, as an exec-form argument vector.
    pub command: Vec<String>,
    /// Attach stdin.
    pub attach_stdin: bool,
    /// Attach stdout.
    pub attach_stdout: bool,
    /// Attach stderr.
    pub attach_stderr: bool,
    /// Allocate a pseudo-TTY.
    pub tty: bool,
    /// Labels used to identify the container later.
    pub labels: BTreeMap<String, String>,
}

/// A single host path bound into the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindMount {
    /// Path on the host.
    pub source: String,
    /// Path inside the container.
    pub target: String,
    /// Mount read-only.
    pub read_only: bool,
}

impl BindMount {
    /// A read-write bind.
    pub fn read_write(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            read_only: false,
        }
    }

    /// A read-only bind.
    pub fn read_only(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            read_only: true,
        }
    }

    /// Docker `Binds` notation: `source:target[:ro]`.
    pub fn to_bind_string(&self) -> String {
        if self.read_only {
            format!("{}:{}:ro", self.source, self.target)
        } else {
            format!("{}:{}", self.source, self.target)
        }
    }
}

/// Host-level configuration of a container.
///
/// There is deliberately no way to build a `HostSpec` piecemeal. The only
/// constructor is [`HostSpec::privileged_host`], which grants privileged mode
/// together with the given mounts and network mode, so the full extent of host
/// access an execution container receives is always visible at one call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSpec {
    mounts: Vec<BindMount>,
    network_mode: String,
    privileged: bool,
}

impl HostSpec {
    /// Host spec for a container with administrative access to its host.
    pub fn privileged_host(mounts: Vec<BindMount>, network_mode: impl Into<String>) -> Self {
        Self {
            mounts,
            network_mode: network_mode.into(),
            privileged: true,
        }
    }

    /// Bind mounts, in order.
    pub fn mounts(&self) -> &[BindMount] {
        &self.mounts
    }

    /// Network mode (e.g. `host`).
    pub fn network_mode(&self) -> &str {
        &self.network_mode
    }

    /// Whether the container runs privileged.
    pub fn privileged(&self) -> bool {
        self.privileged
    }

    /// Mounts rendered in Docker `Binds` notation.
    pub fn binds(&self) -> Vec<String> {
        self.mounts.iter().map(BindMount::to_bind_string).collect()
    }
}

/// Extra networks to attach at creation time. Empty by default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkSpec {
    /// Names of networks to connect the container to.
    pub networks: Vec<String>,
}

/// Opaque identifier of a created container.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerHandle(String);

impl ContainerHandle {
    /// Wrap a runtime-issued container id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the container id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
