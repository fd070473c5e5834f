//! Legacy fixed-digest password hashes.
//!
//! Older accounts store the lowercase hex SHA-256 digest of the plaintext.
//! These are only ever verified; new hashes are always produced by
//! [`PasswordHasher::hash`](super::PasswordHasher::hash).

use sha2::Digest;
use sha2::Sha256;
use subtle::ConstantTimeEq;

/// Compute the legacy digest of a plaintext password.
pub fn digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Check a plaintext password against a stored legacy digest.
///
/// The stored value is hex-decoded and compared byte-wise in constant time.
/// Anything that does not decode to a 32-byte digest never matches.
pub fn matches(stored_digest: &str, password: &str) -> bool {
    let Ok(expected) = hex::decode(stored_digest) else {
        return false;
    };

    let actual = Sha256::digest(password.as_bytes());
    expected.len() == actual.len() && bool::from(expected.as_slice().ct_eq(actual.as_slice()))
}
