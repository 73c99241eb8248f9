//! Text normalization and fingerprints

use sha2::{Digest, Sha256};

/// Hex characters kept from the SHA-256 of a text fingerprint.
pub const TEXT_DIGEST_LEN: usize = 12;

/// Collapse every whitespace run to a single space and trim the ends.
pub fn normalize_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Leading `max_chars` characters of the normalized text.
pub fn snippet(raw: &str, max_chars: usize) -> String {
    normalize_text(raw).chars().take(max_chars).collect()
}

/// Stable fingerprint of normalized text, used by the `:text-digest()` pseudo-class.
pub fn text_digest(raw: &str) -> String {
    let normalized = normalize_text(raw);
    let digest = Sha256::digest(normalized.as_bytes());
    let mut encoded = hex::encode(digest);
    encoded.truncate(TEXT_DIGEST_LEN);
    encoded
}
