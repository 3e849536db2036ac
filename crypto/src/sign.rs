//! HMAC-SHA256 payload signing and verification.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::TokenError;

type HmacSha256 = Hmac<Sha256>;

/// Sign a payload with the server secret, returning the raw MAC.
pub fn sign_payload(secret: &[u8], payload: &[u8]) -> Result<Vec<u8>, TokenError> {
    let mut mac =
        HmacSha256::new_from_slice(secret).map_err(|e| TokenError::Signing(e.to_string()))?;
    mac.update(payload);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Verify a MAC over a payload in constant time.
///
/// Returns `true` if the MAC is valid, `false` otherwise.
pub fn verify_payload(secret: &[u8], payload: &[u8], signature: &[u8]) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(signature).is_ok()
}
