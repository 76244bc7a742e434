//! Per-call request signing.
//!
//! Every privileged call carries an HMAC-SHA256 over
//! `timestamp;app_id;nonce;method`, keyed by the application secret. A
//! [`SignaturePacket`] is minted immediately before the call it authenticates
//! and is consumed when that call is built, so a packet can never be sent
//! twice.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::Sha256;

use crate::error::{ClientError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Number of random characters at the start of every nonce.
pub const NONCE_RANDOM_LENGTH: usize = 10;

/// Process-wide counter appended to nonces.
static NONCE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Computes a lowercase hex HMAC-SHA256 of `data` keyed by `key`.
pub fn hmac_sha256_hex(key: &[u8], data: &[u8]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|err| ClientError::Validation(format!("unusable signing key: {err}")))?;
    mac.update(data);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Signs one call.
///
/// Pure and deterministic: identical inputs always give the same hash.
/// Fails with a validation error when `secret` or `app_id` is empty.
pub fn sign(secret: &str, app_id: &str, method: &str, timestamp: &str, nonce: &str) -> Result<String> {
    if secret.is_empty() {
        return Err(ClientError::Validation(
            "signed calls require an application secret".to_string(),
        ));
    }
    if app_id.is_empty() {
        return Err(ClientError::Validation(
            "signed calls require an application identifier".to_string(),
        ));
    }

    let payload = format!("{timestamp};{app_id};{nonce};{method}");
    hmac_sha256_hex(secret.as_bytes(), payload.as_bytes())
}

/// The signature tuple for exactly one call.
///
/// Remembers the method and application identifier it was hashed over, so
/// the call built from it always carries the same pair. Not `Clone`: it is
/// moved into the call it authenticates.
#[derive(Debug, PartialEq, Eq)]
pub struct SignaturePacket {
    pub(crate) method: String,
    pub(crate) app_id: String,
    pub(crate) timestamp: String,
    pub(crate) nonce: String,
    pub(crate) hash: String,
}

impl SignaturePacket {
    /// The method this packet authenticates.
    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Seconds since the Unix epoch, in decimal.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    /// Lowercase hex HMAC-SHA256.
    pub fn hash(&self) -> &str {
        &self.hash
    }
}

/// Holds the application credentials and mints signature packets.
pub struct AuthSigner {
    secret: String,
    app_id: String,
}

impl AuthSigner {
    /// Creates a signer. Both credentials must be non-empty.
    pub fn new(secret: impl Into<String>, app_id: impl Into<String>) -> Result<Self> {
        let secret = secret.into();
        let app_id = app_id.into();
        if secret.is_empty() || app_id.is_empty() {
            return Err(ClientError::Validation(
                "signed calls require both an application secret and an application identifier"
                    .to_string(),
            ));
        }
        Ok(Self { secret, app_id })
    }

    /// The application identifier sent alongside every signature.
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Mints a new packet for `method` using the current time and a new nonce.
    ///
    /// Call this immediately before sending; a retry must mint again.
    pub fn fresh_challenge(&self, method: &str) -> Result<SignaturePacket> {
        self.challenge_with(method, unix_timestamp(), generate_nonce())
    }

    fn challenge_with(&self, method: &str, timestamp: String, nonce: String) -> Result<SignaturePacket> {
        let hash = sign(&self.secret, &self.app_id, method, &timestamp, &nonce)?;
        Ok(SignaturePacket {
            method: method.to_string(),
            app_id: self.app_id.clone(),
            timestamp,
            nonce,
            hash,
        })
    }
}

impl std::fmt::Debug for AuthSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSigner")
            .field("app_id", &self.app_id)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

fn unix_timestamp() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
        .to_string()
}

/// Random alphanumeric prefix plus a process-wide counter, so two nonces
/// from the same process never collide even if the random part does.
fn generate_nonce() -> String {
    let random: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_RANDOM_LENGTH)
        .map(char::from)
        .collect();
    let sequence = NONCE_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{random}{sequence:x}")
}
