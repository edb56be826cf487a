//! Error types for hostexec-core.

use hostexec_runtime::{EndpointId, RuntimeError};
use std::fmt;
use thiserror::Error;

/// Result type alias for hostexec-core operations.
pub type Result<T> = std::result::Result<T, ExecError>;

/// Provisioning stage a runtime failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Packaging the script into a tar archive.
    Archive,
    /// Pulling the execution image.
    Pull,
    /// Creating the container.
    Create,
    /// Copying the archive into the container.
    Inject,
    /// Starting the container.
    Start,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Archive => write!(f, "archive"),
            Self::Pull => write!(f, "pull"),
            Self::Create => write!(f, "create"),
            Self::Inject => write!(f, "inject"),
            Self::Start => write!(f, "start"),
        }
    }
}

/// Which side of a request/response exchange an error is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// The caller supplied something unusable.
    ClientError,
    /// The service or the endpoint failed.
    ServerError,
}

/// Errors that can occur while executing a script on an endpoint.
#[derive(Debug, Error)]
pub enum ExecError {
    /// Script payload missing or unusable
    #[error("invalid script payload: {0}")]
    Validation(String),

    /// No endpoint registered under this ID
    #[error("endpoint not found: {0}")]
    NotFound(EndpointId),

    /// Endpoint registry could not be queried
    #[error("endpoint lookup failed: {0}")]
    Lookup(String),

    /// Caller may not execute on this endpoint
    #[error("access denied to endpoint {endpoint}: {reason}")]
    AccessDenied {
        /// Endpoint access was requested for
        endpoint: EndpointId,
        /// Why the authorizer refused
        reason: String,
    },

    /// Executor configuration rejected
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Runtime client could not be created
    #[error("unable to connect to endpoint {endpoint}: {source}")]
    Connection {
        /// Endpoint being connected to
        endpoint: EndpointId,
        /// Underlying runtime error
        source: RuntimeError,
    },

    /// A provisioning stage failed
    #[error("command exec ({stage}) error: {source}")]
    Runtime {
        /// Stage that failed
        stage: Stage,
        /// Underlying runtime error
        source: RuntimeError,
    },
}

impl ExecError {
    /// Wrap a runtime error with the stage it occurred in.
    pub fn runtime(stage: Stage, source: impl Into<RuntimeError>) -> Self {
        Self::Runtime {
            stage,
            source: source.into(),
        }
    }

    /// Access refused for `endpoint`.
    pub fn access_denied(endpoint: EndpointId, reason: impl Into<String>) -> Self {
        Self::AccessDenied {
            endpoint,
            reason: reason.into(),
        }
    }

    /// The failed stage, for runtime errors.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Runtime { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Classify the error for the response layer.
    pub fn status_class(&self) -> StatusClass {
        match self {
            Self::Validation(_) | Self::NotFound(_) | Self::AccessDenied { .. } => {
                StatusClass::ClientError
            }
            Self::Lookup(_)
            | Self::InvalidConfig(_)
            | Self::Connection { .. }
            | Self::Runtime { .. } => StatusClass::ServerError,
        }
    }

    /// Check if this error indicates a not-found condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
