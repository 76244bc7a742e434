//! # UserRPC Protocol Library
//!
//! Call model, request signing and error taxonomy for clients of a
//! challenge-response authenticated user-management RPC service.
//!
//! ## Overview
//!
//! - **Values**: flat call arguments ([`CallArgument`]) and the transport's
//!   typed values ([`RpcValue`])
//! - **Signing**: HMAC-SHA256 over `timestamp;app_id;nonce;method`, one fresh
//!   [`SignaturePacket`] per call
//! - **Calls**: anonymous and signed positional parameter lists
//! - **Transport seam**: the [`RpcTransport`] trait the wire layer implements
//! - **Errors**: [`ClientError`] with a kind per failure class
//!
//! ## Signed call layout
//!
//! ```text
//! ┌──────┬────────┬───────────┬───────┬────────────┬─────────────────┐
//! │ hash │ app_id │ timestamp │ nonce │ session_id │ method args ... │
//! └──────┴────────┴───────────┴───────┴────────────┴─────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```rust
//! use protocol::{build_signed, methods, AuthSigner, CallArgument};
//!
//! let signer = AuthSigner::new("shared-secret", "example.com").unwrap();
//! let packet = signer.fresh_challenge(methods::USER_GET).unwrap();
//! let envelope = build_signed("session-id", packet, &[CallArgument::from(42i64)]);
//! assert_eq!(envelope.method(), "user.get");
//! assert_eq!(envelope.session_id(), Some("session-id"));
//! ```
//!
//! ## Modules
//!
//! - [`value`]: argument and result values
//! - [`crypto`]: request signing
//! - [`call`]: call envelopes and method names
//! - [`transport`]: transport trait, faults, deadlines and cancellation
//! - [`state`]: session lifecycle states
//! - [`error`]: error types

pub mod call;
pub mod crypto;
pub mod error;
pub mod state;
pub mod transport;
pub mod value;

pub use call::{build_anonymous, build_signed, methods, CallEnvelope, SIGNED_PREFIX_LEN};
pub use crypto::{hmac_sha256_hex, sign, AuthSigner, SignaturePacket, NONCE_RANDOM_LENGTH};
pub use error::{ClientError, ErrorKind, Result};
pub use state::SessionState;
pub use transport::{
    CallContext, Fault, RpcResponse, RpcTransport, TransportError, TransportErrorKind,
};
pub use value::{CallArgument, Record, RpcValue, Scalar};
