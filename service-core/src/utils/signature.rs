//! HMAC-SHA256 helpers for payment-provider signatures.
//!
//! Both the checkout-verification signature and the webhook signature are
//! hex-encoded HMAC-SHA256 digests. Verification is security-critical and
//! always compares in constant time.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Compute a hex-encoded HMAC-SHA256 signature over `payload`.
pub fn sign_hmac_sha256(secret: &str, payload: &str) -> Result<String, anyhow::Error> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow::anyhow!("Invalid key length: {}", e))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verify a hex-encoded HMAC-SHA256 signature using constant-time comparison.
pub fn verify_hmac_sha256(
    secret: &str,
    payload: &str,
    signature: &str,
) -> Result<bool, anyhow::Error> {
    let expected = sign_hmac_sha256(secret, payload)?;

    let expected_bytes = expected.as_bytes();
    let signature_bytes = signature.as_bytes();

    if expected_bytes.len() != signature_bytes.len() {
        return Ok(false);
    }

    Ok(expected_bytes.ct_eq(signature_bytes).into())
}
