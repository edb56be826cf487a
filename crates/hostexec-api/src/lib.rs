//! # hostexec-api
//!
//! HTTP front end for hostexec: accepts a script upload and runs it on a
//! registered endpoint in a privileged container.
//!
//! ```text
//! POST /api/endpoints/:id/command   (multipart, file field "Script")
//! GET  /health
//! ```

pub mod config;
pub mod error;
pub mod http;

pub use config::{AuthMode, ConfigError, HostexecConfig, DEFAULT_MAX_SCRIPT_BYTES};
pub use error::{ApiError, ErrorBody};
pub use http::{build_router, AppState, SCRIPT_FIELD};
