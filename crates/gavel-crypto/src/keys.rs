use aes_gcm::aead::OsRng;
use aes_gcm::aead::rand_core::RngCore;
use anyhow::Result;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};

/// Fixed length of a conversation key in bytes.
pub const KEY_LEN: usize = 32;

/// Generate a random 256-bit key for AES-256-GCM.
/// Generated once per conversation and immutable afterwards.
pub fn generate_conversation_key() -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    OsRng.fill_bytes(&mut key);
    key
}

/// Encode a key to base64 for transport to the two participants.
pub fn key_to_base64(key: &[u8]) -> String {
    BASE64.encode(key)
}

/// Decode a base64 key.
pub fn key_from_base64(encoded: &str) -> Result<[u8; KEY_LEN]> {
    let bytes = BASE64.decode(encoded)?;
    let key: [u8; KEY_LEN] = bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("Invalid key length"))?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_are_distinct() {
        let a = generate_conversation_key();
        let b = generate_conversation_key();
        assert_ne!(a, b);
    }

    #[test]
    fn base64_roundtrip() {
        let key = generate_conversation_key();
        let encoded = key_to_base64(&key);
        assert_eq!(key_from_base64(&encoded).unwrap(), key);
    }

    #[test]
    fn rejects_wrong_length() {
        let encoded = BASE64.encode([0u8; 16]);
        assert!(key_from_base64(&encoded).is_err());
    }
}
