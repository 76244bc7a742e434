//! The seam to the wire.
//!
//! Encoding calls and moving them over HTTP is the job of an
//! [`RpcTransport`] implementation supplied by the caller. The client hands
//! it a fully built [`CallEnvelope`] together with the caller's
//! [`CallContext`], and gets back either a result value or a service fault.

use std::fmt;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::call::CallEnvelope;
use crate::value::RpcValue;

/// A fault returned by the remote service in place of a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub code: i32,
    pub message: String,
}

impl Fault {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Outcome of a call that reached the remote service.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcResponse {
    Success(RpcValue),
    Fault(Fault),
}

/// Broad category of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    /// The connection could not be opened.
    Connect,
    /// An open connection dropped mid-call.
    ConnectionLost,
    /// The caller's deadline passed.
    DeadlineExceeded,
    /// The caller cancelled the call.
    Cancelled,
    /// Encoding, decoding or HTTP-level failure.
    Protocol,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportErrorKind::Connect => "connect failed",
            TransportErrorKind::ConnectionLost => "connection lost",
            TransportErrorKind::DeadlineExceeded => "deadline exceeded",
            TransportErrorKind::Cancelled => "cancelled",
            TransportErrorKind::Protocol => "transport protocol error",
        };
        f.write_str(name)
    }
}

/// Failure reported by the transport, passed to callers unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// True when the error means the remote session can no longer be used.
    pub fn is_connection_loss(&self) -> bool {
        matches!(
            self.kind,
            TransportErrorKind::Connect | TransportErrorKind::ConnectionLost
        )
    }
}

/// Caller-supplied deadline and cancellation for one call.
///
/// The client never interprets these; they go to the transport as-is.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancellation: CancellationToken,
}

impl CallContext {
    /// A context with no deadline and a token nobody cancels.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the point in time by which the call must finish.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Uses `token` to cancel the call.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}

/// Sends one call and waits for its outcome.
///
/// Implementations must be safe to share between tasks; the client itself
/// never issues two calls at once on the same session.
#[allow(async_fn_in_trait)]
pub trait RpcTransport: Send + Sync {
    /// Sends `envelope`, honouring the deadline and cancellation in `ctx`.
    async fn call(
        &self,
        envelope: &CallEnvelope,
        ctx: &CallContext,
    ) -> Result<RpcResponse, TransportError>;
}
