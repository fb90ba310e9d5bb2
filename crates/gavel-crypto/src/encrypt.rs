use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, KeyInit, OsRng, rand_core::RngCore},
};
use anyhow::{Result, anyhow};

use crate::keys::KEY_LEN;

/// Encrypt a plaintext message with AES-256-GCM.
/// Returns the nonce prepended to the ciphertext, so a message travels as
/// a single opaque blob.
pub fn encrypt_message(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));

    let mut nonce_bytes = [0u8; 12];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| anyhow!("Encryption failed: {}", e))?;

    let mut blob = nonce_bytes.to_vec();
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Decrypt a blob produced by `encrypt_message`.
pub fn decrypt_message(key: &[u8; KEY_LEN], blob: &[u8]) -> Result<Vec<u8>> {
    if blob.len() <= 12 {
        return Err(anyhow!("Blob too short"));
    }
    let (nonce_bytes, ciphertext) = blob.split_at(12);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let nonce = Nonce::from_slice(nonce_bytes);

    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|e| anyhow!("Decryption failed: {}", e))?;

    Ok(plaintext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::generate_conversation_key;

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let key = generate_conversation_key();
        let message = b"Is the listing still available?";

        let blob = encrypt_message(&key, message).unwrap();
        assert_ne!(&blob[12..], message);

        let decrypted = decrypt_message(&key, &blob).unwrap();
        assert_eq!(decrypted, message);
    }

    #[test]
    fn wrong_key_fails() {
        let key1 = generate_conversation_key();
        let key2 = generate_conversation_key();

        let blob = encrypt_message(&key1, b"Secret message").unwrap();
        assert!(decrypt_message(&key2, &blob).is_err());
    }

    #[test]
    fn truncated_blob_fails() {
        let key = generate_conversation_key();
        assert!(decrypt_message(&key, &[0u8; 8]).is_err());
    }
}
