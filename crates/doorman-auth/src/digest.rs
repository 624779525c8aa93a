//! Password digests and session token derivation.
//!
//! A credential is stored as the hex SHA-256 of the plaintext joined
//! with the owning record's numeric id. Salting with the id makes equal
//! passwords digest differently across accounts, and it means a digest
//! can only be verified after the row has been located by login or
//! token.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use doorman_storage::UserId;

const DIGEST_SEPARATOR: u8 = b':';

/// Digest a plaintext password for the given record.
pub fn password_digest(plaintext: &str, id: UserId) -> String {
    let mut hasher = Sha256::new();
    hasher.update(plaintext.as_bytes());
    hasher.update([DIGEST_SEPARATOR]);
    hasher.update(id.get().to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// Derive a session token from the given instant.
///
/// The token is a digest of the nanosecond timestamp: uniqueness is
/// best-effort, not guaranteed, and the token carries no meaning beyond
/// equality with the stored column.
pub fn session_token_at(issued: DateTime<Utc>) -> String {
    let stamp = issued
        .timestamp_nanos_opt()
        .unwrap_or_else(|| issued.timestamp());
    hex::encode(Sha256::digest(stamp.to_be_bytes()))
}

/// Derive a session token from the current instant.
pub fn session_token() -> String {
    session_token_at(Utc::now())
}

/// Compare two byte strings without short-circuiting on the first
/// mismatch.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
