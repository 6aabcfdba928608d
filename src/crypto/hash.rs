/// SHA-256 hashing utilities.
///
/// SHA-256 is used in two places:
/// - Host fingerprints (hash of the platform identifier string)
/// - Record digests (the value sealed into a record's signature field)
use sha2::{Digest, Sha256};

pub const DIGEST_LEN: usize = 32;

/// Hash arbitrary data with SHA-256.
pub fn sha256(data: &[u8]) -> [u8; DIGEST_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_deterministic() {
        let data = b"hostvault";
        assert_eq!(sha256(data), sha256(data));
    }

    #[test]
    fn test_sha256_different_inputs() {
        assert_ne!(sha256(b"hello"), sha256(b"world"));
    }

    #[test]
    fn test_sha256_known_vector() {
        // SHA-256 of the empty string.
        let expected =
            hex::decode("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
                .unwrap();
        assert_eq!(sha256(b"").as_slice(), expected.as_slice());
    }
}
