//! Error types for the protocol crate.

use thiserror::Error;

use crate::state::SessionState;
use crate::transport::TransportError;

/// Client error type covering every failure a call can end in.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Required construction arguments are absent or unusable.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A local precondition failed; nothing was sent to the network.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Operation attempted in a lifecycle state that does not allow it.
    #[error("cannot {operation} while {state}")]
    State {
        /// The rejected operation.
        operation: &'static str,
        /// The state the session was in.
        state: SessionState,
    },

    /// The remote service answered with a fault.
    #[error("remote fault in {method} [{code}]: {message}")]
    RemoteFault {
        /// Method that faulted.
        method: String,
        /// Service-provided fault code.
        code: i32,
        /// Service-provided fault message, verbatim.
        message: String,
    },

    /// Network or connection failure reported by the transport.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A success payload did not have the expected shape.
    #[error("malformed response to {method}: {reason}")]
    MalformedResponse {
        /// Method whose result could not be decoded.
        method: String,
        /// What was wrong with it.
        reason: String,
    },
}

/// Coarse classification of a [`ClientError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    Validation,
    State,
    RemoteFault,
    Transport,
    MalformedResponse,
}

impl ClientError {
    /// Returns the kind of this error so callers can branch on it.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Configuration(_) => ErrorKind::Configuration,
            ClientError::Validation(_) => ErrorKind::Validation,
            ClientError::State { .. } => ErrorKind::State,
            ClientError::RemoteFault { .. } => ErrorKind::RemoteFault,
            ClientError::Transport(_) => ErrorKind::Transport,
            ClientError::MalformedResponse { .. } => ErrorKind::MalformedResponse,
        }
    }

    /// True when the remote service reported the failure.
    pub fn is_remote_fault(&self) -> bool {
        matches!(self, ClientError::RemoteFault { .. })
    }

    pub(crate) fn malformed(method: &str, reason: impl Into<String>) -> Self {
        ClientError::MalformedResponse {
            method: method.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
