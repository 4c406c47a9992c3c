//! Hashing and secret generation
//!
//! Used for downstream request signing and `tradegate secret generate`.

use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::core::constants::MIN_JWT_SECRET_BYTES;

/// Fresh random HMAC secret of `MIN_JWT_SECRET_BYTES`, hex encoded
pub fn generate_signing_secret() -> String {
    let mut secret = vec![0u8; MIN_JWT_SECRET_BYTES];
    rand::thread_rng().fill_bytes(&mut secret);
    hex::encode(secret)
}

/// Lowercase hex SHA-256 digest
pub fn sha256_hex(data: impl AsRef<[u8]>) -> String {
    hex::encode(Sha256::digest(data.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signing_secret_is_long_enough_for_config() {
        let secret = generate_signing_secret();
        assert_eq!(secret.len(), MIN_JWT_SECRET_BYTES * 2);
        assert!(secret.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(secret, generate_signing_secret());
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(sha256_hex(b"abc"), sha256_hex("abc"));
    }

    #[test]
    fn test_downstream_signature_input() {
        // The platform hashes "{api_token}:{timestamp}"
        let digest = sha256_hex(format!("{}:{}", "token", 1_700_000_000));
        assert_eq!(digest.len(), 64);
        assert_ne!(digest, sha256_hex("token:1700000001"));
    }
}
