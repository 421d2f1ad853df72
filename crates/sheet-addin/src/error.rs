//! Error types for the add-in.

use batch_proxy::{HostError, HostType, SessionError};
use thiserror::Error;

/// An action was attempted before the host handshake completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Add-in is not ready: the host handshake has not completed")]
pub struct NotReadyError;

#[derive(Debug, Error)]
pub enum AddInError {
    #[error(transparent)]
    NotReady(#[from] NotReadyError),

    #[error("Unsupported host application: {0:?} (expected Excel)")]
    UnsupportedHost(HostType),

    #[error("Handshake failed: {0}")]
    Handshake(#[source] HostError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("No command registered as '{0}'")]
    UnknownCommand(String),

    #[error("Command '{0}' finished without signaling completion")]
    NotCompleted(String),

    #[error("Dialog was closed before it sent a message")]
    DialogClosed,
}

pub type Result<T, E = AddInError> = std::result::Result<T, E>;
