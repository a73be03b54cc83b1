//! BLAKE3 content hashing for provenance verification.
//!
//! A digest is computed over the exact bytes a producer hands us; nothing is
//! normalized first, so re-encoding or truncating the content changes it.

/// Length of a hex-encoded content digest (256-bit BLAKE3).
pub const CONTENT_HASH_HEX_LEN: usize = 64;

/// Compute the hex-encoded BLAKE3 digest of raw content bytes.
pub fn compute_content_hash(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Whether `s` has the shape of a digest produced by [`compute_content_hash`].
pub fn is_content_hash(s: &str) -> bool {
    s.len() == CONTENT_HASH_HEX_LEN && s.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic() {
        let content = b"Sun Tzu said, The art of war is of vital importance to the state.";
        assert_eq!(compute_content_hash(content), compute_content_hash(content));
    }

    #[test]
    fn empty_input_hashes() {
        let digest = compute_content_hash(b"");
        assert_eq!(
            digest,
            "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262"
        );
        assert!(is_content_hash(&digest));
    }

    #[test]
    fn truncation_changes_digest() {
        let full = b"All warfare is based on deception.";
        assert_ne!(
            compute_content_hash(full),
            compute_content_hash(&full[..full.len() - 1])
        );
    }

    #[test]
    fn shape_check() {
        assert!(!is_content_hash("abc"));
        assert!(!is_content_hash(&"g".repeat(CONTENT_HASH_HEX_LEN)));
        assert!(is_content_hash(&"0".repeat(CONTENT_HASH_HEX_LEN)));
    }
}
