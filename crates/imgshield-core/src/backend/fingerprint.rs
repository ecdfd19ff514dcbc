//! Content fingerprint sent to hash-lookup backends.

use sha2::{Digest, Sha256};

/// SHA-256 of `content` as lowercase hex.
pub fn content_fingerprint(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}
