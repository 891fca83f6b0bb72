//! WAMP-CRA: challenge-response with an HMAC signature.
//!
//! Unlike a ticket, the secret never crosses the wire. The router sends a
//! one-time challenge string, the client signs it with
//! HMAC-SHA256 keyed by its secret, and the router recomputes the same
//! signature and compares in constant time.
//!
//! ```text
//! client                                   router
//!   │ ── Hello [wampcra] ────────────────→ │
//!   │ ←── Challenge { challenge, salt? } ── │   challenge = JSON, fresh nonce
//!   │ ── Authenticate base64(HMAC(key, challenge)) → │
//! ```
//!
//! A salted credential stores only the PBKDF2-derived key. The challenge
//! then carries the salt parameters so the client can derive the same key
//! from its password.

use base64::{Engine, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use rand::distr::{Alphanumeric, SampleString};
use realmgate_protocol::Extra;
use serde_json::{Value, json};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::Identity;

type HmacSha256 = Hmac<Sha256>;

/// PBKDF2 rounds when a salted challenge doesn't say.
pub const DEFAULT_ITERATIONS: u32 = 1000;

/// Derived key length in bytes when a salted challenge doesn't say.
pub const DEFAULT_KEYLEN: usize = 32;

/// Longest derived key a client will agree to compute.
const MAX_KEYLEN: usize = 256;

const NONCE_LEN: usize = 32;

// ---------------------------------------------------------------------------
// SaltParams
// ---------------------------------------------------------------------------

/// How a salted secret was turned into a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaltParams {
    pub salt: String,
    pub iterations: u32,
    pub keylen: usize,
}

impl SaltParams {
    /// Salt with the default iteration count and key length.
    pub fn new(salt: impl Into<String>) -> Self {
        Self {
            salt: salt.into(),
            iterations: DEFAULT_ITERATIONS,
            keylen: DEFAULT_KEYLEN,
        }
    }

    /// Reads salt parameters out of a challenge's extra.
    ///
    /// `None` when the challenge is unsalted, or when the parameters are
    /// out of range (zero iterations, zero or oversized key).
    pub fn from_extra(extra: &Extra) -> Option<Self> {
        let salt = extra.get("salt")?.as_str()?.to_string();
        let iterations = match extra.get("iterations") {
            Some(v) => u32::try_from(v.as_u64()?).ok()?,
            None => DEFAULT_ITERATIONS,
        };
        let keylen = match extra.get("keylen") {
            Some(v) => usize::try_from(v.as_u64()?).ok()?,
            None => DEFAULT_KEYLEN,
        };
        if iterations == 0 || keylen == 0 || keylen > MAX_KEYLEN {
            return None;
        }
        Some(Self {
            salt,
            iterations,
            keylen,
        })
    }

    fn write_to(&self, extra: &mut Extra) {
        extra.insert("salt".into(), Value::from(self.salt.as_str()));
        extra.insert("iterations".into(), Value::from(self.iterations));
        extra.insert("keylen".into(), Value::from(self.keylen));
    }
}

// ---------------------------------------------------------------------------
// Key derivation and signatures
// ---------------------------------------------------------------------------

/// Derives a key from a password with PBKDF2-HMAC-SHA256.
///
/// Returns the key base64-encoded. The encoded string's bytes are what
/// both sides use as the HMAC key.
pub fn derive_key(secret: &str, params: &SaltParams) -> String {
    let mut key = vec![0u8; params.keylen];
    pbkdf2::pbkdf2_hmac::<Sha256>(
        secret.as_bytes(),
        params.salt.as_bytes(),
        params.iterations,
        &mut key,
    );
    STANDARD.encode(key)
}

/// Signs `challenge` with `key`: base64 of HMAC-SHA256.
///
/// `None` only if the MAC rejects the key, which HMAC never does.
pub fn compute_signature(key: &[u8], challenge: &str) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(key).ok()?;
    mac.update(challenge.as_bytes());
    Some(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Recomputes the signature and compares it in constant time.
pub fn verify_signature(key: &[u8], challenge: &str, signature: &str) -> bool {
    compute_signature(key, challenge)
        .is_some_and(|expected| expected.as_bytes().ct_eq(signature.as_bytes()).into())
}

// ---------------------------------------------------------------------------
// Challenge
// ---------------------------------------------------------------------------

/// Builds a fresh challenge string for `identity`.
///
/// JSON with the identity being proven, a random nonce and the issue time,
/// so no two challenges (and no two valid signatures) repeat.
pub(crate) fn new_challenge(identity: &Identity) -> String {
    let nonce = Alphanumeric.sample_string(&mut rand::rng(), NONCE_LEN);
    let timestamp = chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string();
    json!({
        "authid": identity.authid,
        "authrole": identity.authrole,
        "authmethod": identity.authmethod,
        "authprovider": identity.authprovider,
        "nonce": nonce,
        "timestamp": timestamp,
    })
    .to_string()
}

/// The `extra` sent with a WAMP-CRA challenge.
pub(crate) fn challenge_extra(challenge: &str, salt: Option<&SaltParams>) -> Extra {
    let mut extra = Extra::new();
    extra.insert("challenge".into(), Value::from(challenge));
    if let Some(params) = salt {
        params.write_to(&mut extra);
    }
    extra
}

/// Answers a WAMP-CRA challenge the way a client does: derive the key if
/// the challenge is salted, then sign.
///
/// `None` if `extra` carries no challenge string.
pub fn sign_challenge(secret: &str, extra: &Extra) -> Option<String> {
    let challenge = extra.get("challenge")?.as_str()?;
    match SaltParams::from_extra(extra) {
        Some(params) => compute_signature(derive_key(secret, &params).as_bytes(), challenge),
        // Salted, but with parameters we won't run.
        None if extra.contains_key("salt") => None,
        None => compute_signature(secret.as_bytes(), challenge),
    }
}
