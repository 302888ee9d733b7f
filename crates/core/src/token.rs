//! One-way token digests.

use sha2::{Digest, Sha256};

/// Deterministic one-way digest of a bearer token, hex-encoded.
///
/// Stored in place of the raw access token so the session row can
/// cross-check a presented token without ever persisting the secret.
/// No salt: the digest is only compared against a value the server
/// already holds, not used to protect low-entropy material.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
