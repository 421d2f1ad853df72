//! Error types for batched document automation.

use std::time::Duration;

use batch_protocol::{OpId, RemoteErrorKind, RemoteFailure};
use thiserror::Error;

/// The host rejected a flushed batch.
#[derive(Debug, Clone, Error)]
#[error("host rejected batch: {failure}")]
pub struct RemoteSyncError {
    failure: RemoteFailure,
}

impl RemoteSyncError {
    pub fn new(failure: RemoteFailure) -> Self {
        Self { failure }
    }

    pub fn kind(&self) -> RemoteErrorKind {
        self.failure.kind
    }

    pub fn message(&self) -> &str {
        &self.failure.message
    }

    /// The operation the host blamed, if it said.
    pub fn op(&self) -> Option<OpId> {
        self.failure.op
    }

    pub fn failure(&self) -> &RemoteFailure {
        &self.failure
    }
}

impl From<RemoteFailure> for RemoteSyncError {
    fn from(failure: RemoteFailure) -> Self {
        Self::new(failure)
    }
}

/// A round trip to the host could not complete.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to spawn host process: {0}")]
    SpawnFailed(std::io::Error),

    #[error("Host executable not found: {0}")]
    HostNotFound(String),

    #[error("I/O error talking to host: {0}")]
    Io(#[from] std::io::Error),

    #[error("Host disconnected")]
    Disconnected,

    #[error("Timed out after {0:?} waiting for host")]
    Timeout(Duration),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Response id {got} does not match request id {expected}")]
    IdMismatch { expected: u64, got: u64 },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// Errors from a host call: either the host said no, or we never heard back.
#[derive(Debug, Error)]
pub enum HostError {
    #[error(transparent)]
    Remote(#[from] RemoteSyncError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl HostError {
    pub fn remote(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        HostError::Remote(RemoteSyncError::new(RemoteFailure::new(kind, message)))
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, HostError::Remote(_))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, HostError::Transport(_))
    }
}

/// Local misuse of a proxy handle.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProxyError {
    /// The property was never loaded and synchronized on this handle.
    #[error("Property '{property}' of {path} is not loaded; queue a load and sync first")]
    NotLoaded { path: String, property: String },

    #[error("Property '{property}' of {path} is {actual}, expected {expected}")]
    TypeMismatch {
        path: String,
        property: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Handle {path} belongs to a different session")]
    ForeignHandle { path: String },
}

/// Everything that can end a batch session unsuccessfully.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    Proxy(#[from] ProxyError),

    /// A failure raised by the unit of work itself.
    #[error("{0}")]
    Action(Box<dyn std::error::Error + Send + Sync>),
}

impl SessionError {
    pub fn action(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        SessionError::Action(err.into())
    }

    /// The host rejection behind this error, if that is what it is.
    pub fn as_remote(&self) -> Option<&RemoteSyncError> {
        match self {
            SessionError::Host(HostError::Remote(e)) => Some(e),
            _ => None,
        }
    }

    pub fn is_not_loaded(&self) -> bool {
        matches!(self, SessionError::Proxy(ProxyError::NotLoaded { .. }))
    }
}

impl From<RemoteSyncError> for SessionError {
    fn from(e: RemoteSyncError) -> Self {
        SessionError::Host(e.into())
    }
}

impl From<TransportError> for SessionError {
    fn from(e: TransportError) -> Self {
        SessionError::Host(e.into())
    }
}

pub type Result<T, E = SessionError> = std::result::Result<T, E>;
