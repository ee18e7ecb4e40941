//! Failure taxonomy shared by every operation in the crate.

use thiserror::Error;

/// Typed results returned to callers. Nothing is retried internally;
/// transient storage conflicts are the repository's concern.
#[derive(Debug, Error)]
pub enum Error {
    /// A referenced node, folder, document, revision, blob or permission
    /// entry does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The resolver denied the requested capability.
    #[error("permission denied")]
    Forbidden,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation targets state that is no longer current, e.g. a
    /// permission mutation against an archived revision.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The caller identity could not be resolved to a known principal.
    #[error("unauthenticated")]
    Unauthenticated,

    /// Blob store or persistence failure.
    #[error("internal storage failure: {0}")]
    Internal(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Internal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
