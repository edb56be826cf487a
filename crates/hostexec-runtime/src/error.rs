//! Error types for hostexec-runtime.

use thiserror::Error;

/// Result type alias for hostexec-runtime operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Errors that can occur while talking to a container runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Error returned by the Docker Engine API
    #[error("docker API error: {0}")]
    Docker(#[from] bollard::errors::Error),

    /// The requested image is not present on the endpoint
    #[error("image not found on endpoint: {0}")]
    ImageNotFound(String),

    /// Endpoint URL scheme is not one we can connect to
    #[error("unsupported endpoint URL: {0}")]
    UnsupportedUrl(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other runtime failure
    #[error("{0}")]
    Other(String),
}

impl RuntimeError {
    /// Check if this error means the image is missing on the endpoint.
    pub fn is_image_not_found(&self) -> bool {
        matches!(self, RuntimeError::ImageNotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RuntimeError::ImageNotFound("ubuntu:14.04".into());
        assert_eq!(err.to_string(), "image not found on endpoint: ubuntu:14.04");

        let err = RuntimeError::UnsupportedUrl("ftp://host".into());
        assert_eq!(err.to_string(), "unsupported endpoint URL: ftp://host");
    }

    #[test]
    fn test_is_image_not_found() {
        assert!(RuntimeError::ImageNotFound("x".into()).is_image_not_found());
        assert!(!RuntimeError::Other("x".into()).is_image_not_found());
    }
}
