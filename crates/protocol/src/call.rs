//! Assembling positional parameter lists for remote calls.

use crate::crypto::SignaturePacket;
use crate::value::{CallArgument, RpcValue};

/// Remote method names understood by the user service.
pub mod methods {
    pub const SYSTEM_CONNECT: &str = "system.connect";
    pub const USER_LOGIN: &str = "user.login";
    pub const USER_LOGOUT: &str = "user.logout";
    pub const USER_SAVE: &str = "user.save";
    pub const USER_DELETE: &str = "user.delete";
    pub const USER_GET: &str = "user.get";
}

/// Number of parameters a signed call puts in front of its own arguments:
/// hash, application identifier, timestamp, nonce and session identifier.
pub const SIGNED_PREFIX_LEN: usize = 5;

const SESSION_ID_POSITION: usize = 4;

/// A fully built call, ready for the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct CallEnvelope {
    method: String,
    params: Vec<RpcValue>,
    signed: bool,
}

impl CallEnvelope {
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Positional parameters in wire order.
    pub fn params(&self) -> &[RpcValue] {
        &self.params
    }

    pub fn is_signed(&self) -> bool {
        self.signed
    }

    /// The session identifier a signed call carries.
    pub fn session_id(&self) -> Option<&str> {
        if !self.signed {
            return None;
        }
        self.params.get(SESSION_ID_POSITION).and_then(RpcValue::as_str)
    }

    /// The caller's own arguments, without any signature prefix.
    pub fn arguments(&self) -> &[RpcValue] {
        if self.signed {
            &self.params[SIGNED_PREFIX_LEN..]
        } else {
            &self.params
        }
    }
}

/// Builds a call with no signature prefix. Only `system.connect` uses this.
pub fn build_anonymous(method: &str, args: &[CallArgument]) -> CallEnvelope {
    CallEnvelope {
        method: method.to_string(),
        params: args.iter().map(CallArgument::to_rpc_value).collect(),
        signed: false,
    }
}

/// Builds a signed call: `[hash, app_id, timestamp, nonce, session_id, ...args]`.
///
/// The method and application identifier come from `packet`, so the hash
/// always matches the call it travels with. Takes `packet` by value so it
/// cannot be attached to a second call.
pub fn build_signed(session_id: &str, packet: SignaturePacket, args: &[CallArgument]) -> CallEnvelope {
    let SignaturePacket {
        method,
        app_id,
        timestamp,
        nonce,
        hash,
    } = packet;

    let mut params = Vec::with_capacity(SIGNED_PREFIX_LEN + args.len());
    params.push(RpcValue::String(hash));
    params.push(RpcValue::String(app_id));
    params.push(RpcValue::String(timestamp));
    params.push(RpcValue::String(nonce));
    params.push(RpcValue::String(session_id.to_string()));
    params.extend(args.iter().map(CallArgument::to_rpc_value));

    CallEnvelope {
        method,
        params,
        signed: true,
    }
}
