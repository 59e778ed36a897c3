//! Text hashing helpers: cache fingerprints and anonymised log ids.

use sha2::{Digest, Sha256};
use std::fmt::Write as _;

/// Case/whitespace-insensitive key: lowercase + trim, then SHA-256 (hex).
pub fn fingerprint(text: &str) -> String {
    let normalized = text.trim().to_lowercase();
    hex_prefix(&Sha256::digest(normalized.as_bytes()), 32)
}

/// Short id for log lines. Raw text is never logged.
pub fn anon_hash(text: &str) -> String {
    hex_prefix(&Sha256::digest(text.as_bytes()), 6)
}

fn hex_prefix(digest: &[u8], bytes: usize) -> String {
    let mut out = String::with_capacity(bytes * 2);
    for b in digest.iter().take(bytes) {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
