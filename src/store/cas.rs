//! Content addressing
//!
//! A document is identified by the SHA-256 of its canonical text. Two
//! documents that normalize to the same canonical form share a hash; any
//! semantic change produces a new one. The hash doubles as the optimistic
//! concurrency token for the write path.

use sha2::{Digest, Sha256};

pub fn canonical_hash(canonical: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}
