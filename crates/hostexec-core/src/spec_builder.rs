//! Builds container specs from the configured execution environment.

use crate::archive::SCRIPT_NAME;
use crate::config::ExecEnvironment;
use hostexec_runtime::{HostSpec, NetworkSpec, ProcessSpec};
use std::collections::BTreeMap;

/// Derives process, host and network specs from an [`ExecEnvironment`].
///
/// All methods are pure functions of the environment; there is no
/// per-request branching apart from the labels passed in.
#[derive(Debug, Clone)]
pub struct SpecBuilder {
    env: ExecEnvironment,
}

impl SpecBuilder {
    /// Create a spec builder for the given environment.
    pub fn new(env: ExecEnvironment) -> Self {
        Self { env }
    }

    /// The environment specs are derived from.
    pub fn environment(&self) -> &ExecEnvironment {
        &self.env
    }

    /// Directory the archive is extracted into.
    pub fn script_dir(&self) -> &str {
        &self.env.script_dir
    }

    /// Absolute in-container path of the copied script.
    pub fn script_path(&self) -> String {
        format!("{}/{}", self.env.script_dir.trim_end_matches('/'), SCRIPT_NAME)
    }

    /// Process spec running `script_path` as the sole command.
    ///
    /// `labels` are merged over the environment's static labels.
    pub fn process_spec(&self, script_path: &str, labels: BTreeMap<String, String>) -> ProcessSpec {
        let mut all_labels = self.env.labels.clone();
        all_labels.extend(labels);

        ProcessSpec {
            image: self.env.image.clone(),
            working_dir: self.env.script_dir.clone(),
            command: vec![script_path.to_string()],
            attach_stdin: true,
            attach_stdout: true,
            attach_stderr: true,
            tty: true,
            labels: all_labels,
        }
    }

    /// Privileged host spec with the environment's mounts and network mode.
    pub fn host_spec(&self) -> HostSpec {
        HostSpec::privileged_host(self.env.mounts.clone(), self.env.network_mode.clone())
    }

    /// Network spec attaching the environment's extra networks.
    pub fn network_spec(&self) -> NetworkSpec {
        NetworkSpec {
            networks: self.env.networks.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostexec_runtime::BindMount;

    #[test]
    fn test_default_process_spec() {
        let builder = SpecBuilder::new(ExecEnvironment::default());
        let spec = builder.process_spec(&builder.script_path(), BTreeMap::new());

        assert_eq!(spec.command, vec!["/tmp/script.sh".to_string()]);
        assert_eq!(spec.working_dir, "/tmp");
        assert_eq!(spec.image, "ubuntu:14.04");
        assert!(spec.attach_stdin && spec.attach_stdout && spec.attach_stderr);
        assert!(spec.tty);
    }

    #[test]
    fn test_script_path_trailing_slash() {
        let env = ExecEnvironment::builder().script_dir("/opt/run/").build().unwrap();
        assert_eq!(SpecBuilder::new(env).script_path(), "/opt/run/script.sh");

        let env = ExecEnvironment::builder().script_dir("/").build().unwrap();
        assert_eq!(SpecBuilder::new(env).script_path(), "/script.sh");
    }

    #[test]
    fn test_labels_merge_over_static_labels() {
        let env = ExecEnvironment::builder()
            .label("team", "infra")
            .label("io.hostexec.command", "static")
            .build()
            .unwrap();
        let builder = SpecBuilder::new(env);

        let mut labels = BTreeMap::new();
        labels.insert("io.hostexec.command".to_string(), "true".to_string());
        let spec = builder.process_spec("/tmp/script.sh", labels);

        assert_eq!(spec.labels.get("team").map(String::as_str), Some("infra"));
        assert_eq!(
            spec.labels.get("io.hostexec.command").map(String::as_str),
            Some("true")
        );
    }

    #[test]
    fn test_default_host_spec_is_privileged_host_access() {
        let spec = SpecBuilder::new(ExecEnvironment::default()).host_spec();

        assert!(spec.privileged());
        assert_eq!(spec.network_mode(), "host");
        assert_eq!(spec.binds(), vec!["/:/host", "/etc:/etc:ro"]);
    }

    #[test]
    fn test_alternate_environment() {
        let env = ExecEnvironment::builder()
            .image("alpine:3")
            .mounts(vec![BindMount::read_only("/srv", "/srv")])
            .network_mode("bridge")
            .network("ops")
            .build()
            .unwrap();
        let builder = SpecBuilder::new(env);

        let host = builder.host_spec();
        assert_eq!(host.binds(), vec!["/srv:/srv:ro"]);
        assert_eq!(host.network_mode(), "bridge");
        assert!(host.privileged());
        assert_eq!(builder.network_spec().networks, vec!["ops".to_string()]);
        assert_eq!(
            builder.process_spec(&builder.script_path(), BTreeMap::new()).image,
            "alpine:3"
        );
    }
}
