//! Error types for the in-memory host.

use batch_protocol::{RemoteErrorKind, RemoteFailure};
use thiserror::Error;

/// Result of executing against the document model.
pub type ExecResult<T> = std::result::Result<T, RemoteFailure>;

pub(crate) fn invalid_reference(msg: impl Into<String>) -> RemoteFailure {
    RemoteFailure::new(RemoteErrorKind::InvalidReference, msg)
}

pub(crate) fn unknown_member(owner: &str, member: &str) -> RemoteFailure {
    RemoteFailure::new(
        RemoteErrorKind::UnknownMember,
        format!("{owner} has no member '{member}'"),
    )
}

pub(crate) fn type_mismatch(what: &str, expected: &str, actual: &str) -> RemoteFailure {
    RemoteFailure::new(
        RemoteErrorKind::TypeMismatch,
        format!("{what}: expected {expected}, got {actual}"),
    )
}

pub(crate) fn invalid_argument(msg: impl Into<String>) -> RemoteFailure {
    RemoteFailure::new(RemoteErrorKind::InvalidArgument, msg)
}

pub(crate) fn permission_denied(sheet: &str) -> RemoteFailure {
    RemoteFailure::new(
        RemoteErrorKind::PermissionDenied,
        format!("worksheet '{sheet}' is protected"),
    )
}

pub(crate) fn stale_handle(msg: impl Into<String>) -> RemoteFailure {
    RemoteFailure::new(RemoteErrorKind::StaleHandle, msg)
}

/// Errors that stop the stdio server loop.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
