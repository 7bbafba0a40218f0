//! Error types shared across kubetest
//!
//! Every fallible operation returns [`Error`]. Cluster responses keep their
//! HTTP status in [`ApiError`] so callers can decide on retries themselves;
//! kubetest never retries on its own.

use crate::wait::WaitError;
use std::fmt;

/// A non-2xx response from the Kubernetes API server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// HTTP status code (404, 409, 403, ...)
    pub code: u16,
    /// Machine-readable reason from the server (`NotFound`, `AlreadyExists`, ...)
    pub reason: String,
    /// Human-readable message from the server
    pub message: String,
}

impl ApiError {
    pub fn new(code: u16, reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
            message: message.into(),
        }
    }

    /// A 404 for the given resource
    pub fn not_found(resource: &str) -> Self {
        Self::new(404, "NotFound", format!("{resource} not found"))
    }

    /// A 409 for the given resource
    pub fn already_exists(resource: &str) -> Self {
        Self::new(409, "AlreadyExists", format!("{resource} already exists"))
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.code == 404
    }

    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.code == 409
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.code, self.reason, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<kube::Error> for Error {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(resp) => Error::Api(ApiError::new(resp.code, resp.reason, resp.message)),
            other => Error::Client(other.to_string()),
        }
    }
}

/// Errors from kubetest operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Kubernetes API error: {0}")]
    Api(#[from] ApiError),

    #[error("no wrapper registered for kind '{kind}' (apiVersion '{api_version}')")]
    UnresolvedKind { kind: String, api_version: String },

    #[error("invalid argument: {0}")]
    Argument(String),

    #[error("{0}")]
    Timeout(#[from] WaitError),

    #[error("cannot {operation} while test context is {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    #[error("cluster client error: {0}")]
    Client(String),

    #[error("failed to load manifest {path}: {reason}")]
    Manifest { path: String, reason: String },

    #[error("failed to convert {kind} object: {reason}")]
    Conversion { kind: String, reason: String },
}

impl Error {
    /// Whether this is an API 404
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Api(e) if e.is_not_found())
    }

    /// Whether this is an API 409
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Api(e) if e.is_conflict())
    }
}

/// Result alias used throughout kubetest
pub type Result<T, E = Error> = std::result::Result<T, E>;
