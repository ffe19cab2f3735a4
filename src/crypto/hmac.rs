//! HMAC-SHA256 per RFC 2104.
//!
//! Key is zero-padded to the 64-byte block size (SHA-256'd first if
//! longer than the block), then XORed with the inner (`0x36`) and outer
//! (`0x5C`) pad constants.

use crate::crypto::sha256::{sha256, Sha256};

const BLOCK_SIZE: usize = 64;
const IPAD: u8 = 0x36;
const OPAD: u8 = 0x5C;

pub fn hmac_sha256(key: &[u8], message: &[u8]) -> [u8; 32] {
    let mut block_key = [0u8; BLOCK_SIZE];
    if key.len() > BLOCK_SIZE {
        let digest = sha256(key);
        block_key[..32].copy_from_slice(&digest);
    } else {
        block_key[..key.len()].copy_from_slice(key);
    }

    let mut ipad_key = [0u8; BLOCK_SIZE];
    let mut opad_key = [0u8; BLOCK_SIZE];
    for i in 0..BLOCK_SIZE {
        ipad_key[i] = block_key[i] ^ IPAD;
        opad_key[i] = block_key[i] ^ OPAD;
    }

    let mut inner = Sha256::new();
    inner.update(&ipad_key);
    inner.update(message);
    let inner_digest = inner.finalize();

    let mut outer = Sha256::new();
    outer.update(&opad_key);
    outer.update(&inner_digest);
    outer.finalize()
}

pub fn hmac_sha256_hex(key: &[u8], message: &[u8]) -> String {
    hmac_sha256(key, message)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc4231_known_answer() {
        // Matches the RFC 4231 test case reused by the cloud bootstrap
        // signature property.
        let digest = hmac_sha256_hex(b"key", b"The quick brown fox jumps over the lazy dog");
        assert_eq!(
            digest,
            "f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8"
        );
    }

    #[test]
    fn different_keys_produce_different_macs() {
        let a = hmac_sha256(b"key-a", b"same message");
        let b = hmac_sha256(b"key-b", b"same message");
        assert_ne!(a, b);
    }

    #[test]
    fn long_key_is_hashed_first() {
        let long_key = vec![0x5Au8; 100];
        // Should not panic and should be deterministic.
        let a = hmac_sha256(&long_key, b"msg");
        let b = hmac_sha256(&long_key, b"msg");
        assert_eq!(a, b);
    }
}
