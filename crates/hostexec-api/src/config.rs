//! Configuration for the HTTP API.
//!
//! Configuration is loaded from environment variables with sensible defaults.

use hostexec_core::{
    AllowAll, Authorizer, CleanupPolicy, ExecEnvironment, ExecError,
    Executor, ExecutorConfig, ImagePolicy, StaticRegistry, TokenAuthorizer, DEFAULT_IMAGE,
    DEFAULT_NETWORK_MODE, DEFAULT_SCRIPT_DIR,
};
use hostexec_runtime::{ClientProvider, Endpoint, EndpointId, DEFAULT_REQUEST_TIMEOUT_SECS};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

/// Maximum accepted script size in bytes (10 MB).
pub const DEFAULT_MAX_SCRIPT_BYTES: usize = 10 * 1024 * 1024;

/// How execution requests are authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// Bearer tokens from `HOSTEXEC_TOKENS` (default).
    #[default]
    Token,
    /// Every caller may execute on every endpoint.
    Disabled,
}

impl AuthMode {
    /// Parse from string (case-insensitive).
    ///
    /// Returns `None` for unrecognised values.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "token" => Some(Self::Token),
            "none" | "off" | "disabled" => Some(Self::Disabled),
            _ => None,
        }
    }
}

/// Configuration validation error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid endpoint entry {0:?}: expected id=name@url")]
    InvalidEndpoint(String),

    #[error("invalid token entry {0:?}: expected token=id,id or token=*")]
    InvalidToken(String),

    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

/// Configuration for the hostexec API server.
#[derive(Clone)]
pub struct HostexecConfig {
    /// HTTP server bind address.
    pub http_addr: SocketAddr,

    /// Image the script container runs.
    pub image: String,

    /// Directory the script is copied into.
    pub script_dir: String,

    /// Container network mode.
    pub network_mode: String,

    /// Registered endpoints.
    pub endpoints: Vec<Endpoint>,

    /// Authorization mode.
    pub auth_mode: AuthMode,

    /// Token grants used in [`AuthMode::Token`].
    pub tokens: TokenAuthorizer,

    /// What happens to a container whose provisioning failed.
    pub cleanup: CleanupPolicy,

    /// Pull the image when the endpoint lacks it.
    pub pull_images: bool,

    /// Per-request timeout for runtime API calls, in seconds.
    pub request_timeout_secs: u64,

    /// Largest accepted script upload.
    pub max_script_bytes: usize,
}

// Tokens are credentials; keep them out of `?config` log lines.
impl std::fmt::Debug for HostexecConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostexecConfig")
            .field("http_addr", &self.http_addr)
            .field("image", &self.image)
            .field("script_dir", &self.script_dir)
            .field("network_mode", &self.network_mode)
            .field("endpoints", &self.endpoints)
            .field("auth_mode", &self.auth_mode)
            .field("tokens", &self.tokens.token_count())
            .field("cleanup", &self.cleanup)
            .field("pull_images", &self.pull_images)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_script_bytes", &self.max_script_bytes)
            .finish()
    }
}

impl Default for HostexecConfig {
    fn default() -> Self {
        Self {
            http_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)), 8080),
            image: DEFAULT_IMAGE.to_string(),
            script_dir: DEFAULT_SCRIPT_DIR.to_string(),
            network_mode: DEFAULT_NETWORK_MODE.to_string(),
            endpoints: vec![Endpoint::new(1, "local", "local")],
            auth_mode: AuthMode::Token,
            tokens: TokenAuthorizer::new(),
            cleanup: CleanupPolicy::default(),
            pull_images: false,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_script_bytes: DEFAULT_MAX_SCRIPT_BYTES,
        }
    }
}

impl HostexecConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `HOSTEXEC_HTTP_HOST` | `0.0.0.0` |
    /// | `HOSTEXEC_HTTP_PORT` | `8080` |
    /// | `HOSTEXEC_IMAGE` | `ubuntu:14.04` |
    /// | `HOSTEXEC_SCRIPT_DIR` | `/tmp` |
    /// | `HOSTEXEC_NETWORK_MODE` | `host` |
    /// | `HOSTEXEC_ENDPOINTS` | `1=local@local` (`id=name@url;...`) |
    /// | `HOSTEXEC_AUTH` | `token` (token, none) |
    /// | `HOSTEXEC_TOKENS` | empty (`token=1,2;admin=*`) |
    /// | `HOSTEXEC_CLEANUP` | `remove` (remove, preserve) |
    /// | `HOSTEXEC_PULL` | `false` |
    /// | `HOSTEXEC_REQUEST_TIMEOUT` | `120` |
    /// | `HOSTEXEC_MAX_SCRIPT_BYTES` | `10485760` |
    ///
    /// # Errors
    /// Malformed endpoint or token lists, unparseable numbers and unknown
    /// mode or flag values are rejected rather than replaced by defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let default = Self::default();

        let http_host: IpAddr = parse_var("HOSTEXEC_HTTP_HOST")?
            .unwrap_or(default.http_addr.ip());
        let http_port: u16 = parse_var("HOSTEXEC_HTTP_PORT")?.unwrap_or(default.http_addr.port());

        let endpoints = match std::env::var("HOSTEXEC_ENDPOINTS") {
            Ok(v) if !v.trim().is_empty() => parse_endpoints(&v)?,
            _ => default.endpoints,
        };
        let tokens = match std::env::var("HOSTEXEC_TOKENS") {
            Ok(v) => parse_tokens(&v)?,
            Err(_) => default.tokens,
        };

        Ok(Self {
            http_addr: SocketAddr::new(http_host, http_port),
            image: std::env::var("HOSTEXEC_IMAGE").unwrap_or(default.image),
            script_dir: std::env::var("HOSTEXEC_SCRIPT_DIR").unwrap_or(default.script_dir),
            network_mode: std::env::var("HOSTEXEC_NETWORK_MODE").unwrap_or(default.network_mode),
            endpoints,
            auth_mode: parse_var_with("HOSTEXEC_AUTH", AuthMode::parse)?
                .unwrap_or(default.auth_mode),
            tokens,
            cleanup: parse_var_with("HOSTEXEC_CLEANUP", CleanupPolicy::parse)?
                .unwrap_or(default.cleanup),
            pull_images: parse_var_with("HOSTEXEC_PULL", parse_bool)?
                .unwrap_or(default.pull_images),
            request_timeout_secs: parse_var("HOSTEXEC_REQUEST_TIMEOUT")?
                .unwrap_or(default.request_timeout_secs),
            max_script_bytes: parse_var("HOSTEXEC_MAX_SCRIPT_BYTES")?
                .unwrap_or(default.max_script_bytes),
        })
    }

    /// Log warnings for settings that are legal but probably unintended.
    pub fn validate_warn(&self) {
        if self.auth_mode == AuthMode::Disabled {
            tracing::warn!("Authorization disabled: any caller may run scripts as root on every endpoint");
        } else if self.tokens.token_count() == 0 {
            tracing::warn!("No tokens configured: every execution request will be denied");
        }

        if self.endpoints.is_empty() {
            tracing::warn!("No endpoints configured");
        }

        if self.cleanup == CleanupPolicy::Preserve {
            tracing::warn!("Failed containers will be preserved on endpoints");
        }
    }

    /// The execution environment described by this configuration.
    pub fn environment(&self) -> Result<ExecEnvironment, ExecError> {
        ExecEnvironment::builder()
            .image(&self.image)
            .script_dir(&self.script_dir)
            .network_mode(&self.network_mode)
            .build()
    }

    /// Executor settings described by this configuration.
    pub fn executor_config(&self) -> Result<ExecutorConfig, ExecError> {
        let image_policy = if self.pull_images {
            ImagePolicy::PullIfMissing
        } else {
            ImagePolicy::Require
        };
        Ok(ExecutorConfig::new(self.environment()?)
            .with_cleanup(self.cleanup)
            .with_image_policy(image_policy))
    }

    /// Registry holding the configured endpoints.
    pub fn registry(&self) -> StaticRegistry {
        self.endpoints.iter().cloned().collect()
    }

    /// Authorizer selected by [`auth_mode`](Self::auth_mode).
    pub fn authorizer(&self) -> Arc<dyn Authorizer> {
        match self.auth_mode {
            AuthMode::Token => Arc::new(self.tokens.clone()),
            AuthMode::Disabled => Arc::new(AllowAll),
        }
    }

    /// Build an executor that reaches endpoints through `provider`.
    pub fn build_executor(&self, provider: Arc<dyn ClientProvider>) -> Result<Executor, ExecError> {
        Executor::new(
            Arc::new(self.registry()),
            self.authorizer(),
            provider,
            self.executor_config()?,
        )
    }
}

/// Parse an optional environment variable, rejecting malformed values.
fn parse_var<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        Err(_) => Ok(None),
    }
}

/// Like [`parse_var`] for values with a hand-written parser.
fn parse_var_with<T>(
    name: &'static str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Option<T>, ConfigError> {
    match std::env::var(name) {
        Ok(value) => parse(&value)
            .map(Some)
            .ok_or(ConfigError::InvalidValue { name, value }),
        Err(_) => Ok(None),
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse `id=name@url` entries separated by `;`.
///
/// The name may be omitted (`id=url`), in which case `endpoint-<id>` is used.
pub fn parse_endpoints(s: &str) -> Result<Vec<Endpoint>, ConfigError> {
    s.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let invalid = || ConfigError::InvalidEndpoint(entry.to_string());
            let (id, target) = entry.split_once('=').ok_or_else(invalid)?;
            let id: EndpointId = id.parse().map_err(|_| invalid())?;
            let (name, url) = match target.split_once('@') {
                Some((name, url)) => (name.trim().to_string(), url.trim()),
                None => (format!("endpoint-{id}"), target.trim()),
            };
            if url.is_empty() || name.is_empty() {
                return Err(invalid());
            }
            Ok(Endpoint::new(id, name, url))
        })
        .collect()
}

/// Parse `token=id,id` / `token=*` entries separated by `;`.
pub fn parse_tokens(s: &str) -> Result<TokenAuthorizer, ConfigError> {
    let mut auth = TokenAuthorizer::new();
    for entry in s.split(';').map(str::trim).filter(|e| !e.is_empty()) {
        let invalid = || ConfigError::InvalidToken(entry.to_string());
        let (token, scope) = entry.split_once('=').ok_or_else(invalid)?;
        let token = token.trim();
        if token.is_empty() {
            return Err(invalid());
        }

        if scope.trim() == "*" {
            auth = auth.grant_all(token);
            continue;
        }
        for id in scope.split(',').map(str::trim).filter(|id| !id.is_empty()) {
            let id: EndpointId = id.parse().map_err(|_| invalid())?;
            auth = auth.grant(token, id);
        }
    }
    Ok(auth)
}
