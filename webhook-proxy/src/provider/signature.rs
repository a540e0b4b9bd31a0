//! Webhook signature verification.
//!
//! GitHub signs the payload with an HMAC keyed by the webhook secret.
//! GitLab sends the secret itself as a token. Both checks here take the
//! same time wherever the first differing byte occurs.
//! Reference: https://docs.github.com/en/webhooks/using-webhooks/validating-webhook-deliveries

use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::warn;

pub type HmacSha256 = Hmac<Sha256>;
pub type HmacSha1 = Hmac<Sha1>;

/// Verify a hex-encoded HMAC-SHA256 digest of `payload` keyed by `secret`.
pub fn verify_hmac_sha256(secret: &str, payload: &[u8], signature_hex: &str) -> bool {
    verify_hmac::<HmacSha256>(secret, payload, signature_hex)
}

/// Verify a hex-encoded HMAC-SHA1 digest of `payload` keyed by `secret`.
pub fn verify_hmac_sha1(secret: &str, payload: &[u8], signature_hex: &str) -> bool {
    verify_hmac::<HmacSha1>(secret, payload, signature_hex)
}

fn verify_hmac<M: Mac + KeyInit>(secret: &str, payload: &[u8], signature_hex: &str) -> bool {
    if secret.is_empty() || signature_hex.is_empty() {
        warn!(
            has_secret = !secret.is_empty(),
            has_signature = !signature_hex.is_empty(),
            "hmac_signature_missing_fields"
        );
        return false;
    }

    let expected = match hex::decode(signature_hex) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "hmac_signature_invalid_hex");
            return false;
        }
    };

    let mut mac = match <M as KeyInit>::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => {
            warn!("hmac_signature_invalid_key");
            return false;
        }
    };
    mac.update(payload);

    // verify_slice compares in constant time
    let valid = mac.verify_slice(&expected).is_ok();

    if !valid {
        warn!(
            payload_length = payload.len(),
            signature_length = signature_hex.len(),
            "hmac_signature_mismatch"
        );
    }

    valid
}

/// Constant-time token comparison.
///
/// Both sides are hashed to fixed-length digests first, so neither the
/// content nor the length of the expected token leaks.
pub fn token_matches(expected: &str, provided: &str) -> bool {
    if expected.is_empty() || provided.is_empty() {
        return false;
    }

    let expected_hash = Sha256::digest(expected.as_bytes());
    let provided_hash = Sha256::digest(provided.as_bytes());
    bool::from(expected_hash.as_slice().ct_eq(provided_hash.as_slice()))
}
