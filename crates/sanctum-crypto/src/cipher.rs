//! ChaCha20-Poly1305 authenticated encryption
//!
//! Records keep their nonce next to the ciphertext rather than prepended
//! to it, so `encrypt` hands both back separately.

use chacha20poly1305::{
    aead::{Aead, KeyInit, OsRng},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use thiserror::Error;
use zeroize::Zeroizing;

/// 256-bit key (32 bytes)
pub const KEY_SIZE: usize = 32;
/// 96-bit nonce (12 bytes)
pub const NONCE_SIZE: usize = 12;

#[derive(Error, Debug)]
pub enum CipherError {
    #[error("Encryption failed")]
    EncryptionFailed,

    #[error("Decryption failed - wrong key, or data corrupted or tampered")]
    DecryptionFailed,

    #[error("Invalid key size: expected {KEY_SIZE}, got {0}")]
    InvalidKeySize(usize),

    #[error("Invalid nonce size: expected {NONCE_SIZE}, got {0}")]
    InvalidNonceSize(usize),
}

/// Generate a cryptographically secure random nonce
pub fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Encrypt plaintext under `key` with a freshly drawn nonce.
///
/// Returns `(nonce, ciphertext || tag)`.
pub fn encrypt(key: &[u8], plaintext: &[u8]) -> Result<([u8; NONCE_SIZE], Vec<u8>), CipherError> {
    if key.len() != KEY_SIZE {
        return Err(CipherError::InvalidKeySize(key.len()));
    }

    let cipher = ChaCha20Poly1305::new_from_slice(key)
        .map_err(|_| CipherError::InvalidKeySize(key.len()))?;

    let nonce_bytes = generate_nonce();
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|_| CipherError::EncryptionFailed)?;

    Ok((nonce_bytes, ciphertext))
}

/// Decrypt ciphertext produced by [`encrypt`] using the nonce stored with it.
pub fn decrypt(key: &[u8], nonce: &[u8], ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>, CipherError> {
    if key.len() != KEY_SIZE {
        return Err(CipherError::InvalidKeySize(key.len()));
    }
    if nonce.len() != NONCE_SIZE {
        return Err(CipherError::InvalidNonceSize(nonce.len()));
    }

    let cipher = ChaCha20Poly1305::new_from_slice(key)
        .map_err(|_| CipherError::InvalidKeySize(key.len()))?;

    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CipherError::DecryptionFailed)?;

    Ok(Zeroizing::new(plaintext))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> [u8; KEY_SIZE] {
        let mut key = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut key);
        key
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = key();
        let plaintext = br#"{"mood":5,"note":"slept well"}"#;

        let (nonce, ciphertext) = encrypt(&key, plaintext).unwrap();
        assert_ne!(ciphertext.as_slice(), plaintext.as_slice());

        let decrypted = decrypt(&key, &nonce, &ciphertext).unwrap();
        assert_eq!(decrypted.as_slice(), plaintext);
    }

    #[test]
    fn test_nonce_is_fresh_per_call() {
        let key = key();
        let plaintext = b"same input twice";

        let (n1, c1) = encrypt(&key, plaintext).unwrap();
        let (n2, c2) = encrypt(&key, plaintext).unwrap();

        assert_ne!(n1, n2);
        assert_ne!(c1, c2);
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = key();
        let (nonce, mut ciphertext) = encrypt(&key, b"secret data").unwrap();

        if let Some(byte) = ciphertext.last_mut() {
            *byte ^= 0xFF;
        }

        assert!(matches!(
            decrypt(&key, &nonce, &ciphertext),
            Err(CipherError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_wrong_key_fails() {
        let (nonce, ciphertext) = encrypt(&key(), b"secret data").unwrap();
        assert!(decrypt(&key(), &nonce, &ciphertext).is_err());
    }

    #[test]
    fn test_bad_sizes_rejected() {
        assert!(matches!(
            encrypt(&[0u8; 16], b"x"),
            Err(CipherError::InvalidKeySize(16))
        ));
        assert!(matches!(
            decrypt(&key(), &[0u8; 8], b"x"),
            Err(CipherError::InvalidNonceSize(8))
        ));
    }
}
