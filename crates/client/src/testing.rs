//! An in-memory transport that replays scripted outcomes.
//!
//! Useful for exercising code built on the client without a live service:
//! queue the responses the service would give, run the operations, then
//! inspect the calls that were sent.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use protocol::{
    CallContext, CallEnvelope, Fault, RpcResponse, RpcTransport, RpcValue, TransportError,
    TransportErrorKind,
};

/// Transport that answers calls from a queue, in order.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<RpcResponse, TransportError>>>,
    sent: Mutex<Vec<CallEnvelope>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful result.
    pub fn push_success(&self, value: RpcValue) -> &Self {
        self.push(Ok(RpcResponse::Success(value)))
    }

    /// Queues a service fault.
    pub fn push_fault(&self, code: i32, message: &str) -> &Self {
        self.push(Ok(RpcResponse::Fault(Fault::new(code, message))))
    }

    /// Queues a transport failure.
    pub fn push_error(&self, kind: TransportErrorKind, message: &str) -> &Self {
        self.push(Err(TransportError::new(kind, message)))
    }

    fn push(&self, outcome: Result<RpcResponse, TransportError>) -> &Self {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(outcome);
        self
    }

    /// Every call sent so far, oldest first.
    pub fn sent(&self) -> Vec<CallEnvelope> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The most recent call sent.
    pub fn last_sent(&self) -> Option<CallEnvelope> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    /// Number of queued outcomes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl RpcTransport for ScriptedTransport {
    async fn call(
        &self,
        envelope: &CallEnvelope,
        ctx: &CallContext,
    ) -> Result<RpcResponse, TransportError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(envelope.clone());

        if ctx.cancellation().is_cancelled() {
            return Err(TransportError::new(
                TransportErrorKind::Cancelled,
                format!("{} cancelled before sending", envelope.method()),
            ));
        }

        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| {
                Err(TransportError::new(
                    TransportErrorKind::Protocol,
                    format!("no scripted response for {}", envelope.method()),
                ))
            })
    }
}
