//! SHA-256 content hashing, used for document dedup keys and prompt provenance.

use sha2::{Digest, Sha256};

pub fn hash_bytes(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

pub fn hash_string(content: &str) -> String {
    hash_bytes(content.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_64_hex_chars() {
        let digest = hash_string("hello");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(hash_string("hello"), hash_string("hello"));
        assert_ne!(hash_string("hello"), hash_string("Hello"));
    }

    #[test]
    fn bytes_and_string_hash_agree() {
        assert_eq!(hash_bytes(b"hello"), hash_string("hello"));
    }
}
