//! Durable key material storage

use thiserror::Error;

#[derive(Error, Debug)]
pub enum KeyStoreError {
    #[error("Keychain not available")]
    NotAvailable,
    #[error("Key generation failed")]
    Generation,
    #[error("Stored key is invalid: {0}")]
    InvalidKey(String),
    #[error("Platform error: {0}")]
    Platform(String),
}

/// Where the raw device key lives between runs.
///
/// Implementations persist bytes only; generation and validation belong to
/// [`crate::KeyManager`].
pub trait KeyStore: Send + Sync {
    /// Load the raw key bytes, `None` if no key has been stored.
    fn load(&self) -> Result<Option<Vec<u8>>, KeyStoreError>;

    /// Persist raw key bytes, replacing any previous key.
    fn save(&self, key: &[u8]) -> Result<(), KeyStoreError>;

    /// Remove the stored key. Removing an absent key is not an error.
    fn delete(&self) -> Result<(), KeyStoreError>;
}

/// Key store backed by the operating system keychain.
pub struct KeychainKeyStore {
    service_name: String,
}

const KEY_ACCOUNT: &str = "device_key";

impl KeychainKeyStore {
    pub fn new(service_name: &str) -> Self {
        Self { service_name: service_name.to_string() }
    }

    fn entry(&self) -> Result<keyring::Entry, KeyStoreError> {
        keyring::Entry::new(&self.service_name, KEY_ACCOUNT)
            .map_err(|e| KeyStoreError::Platform(e.to_string()))
    }
}

impl KeyStore for KeychainKeyStore {
    fn load(&self) -> Result<Option<Vec<u8>>, KeyStoreError> {
        let encoded = match self.entry()?.get_password() {
            Ok(encoded) => encoded,
            Err(keyring::Error::NoEntry) => return Ok(None),
            Err(keyring::Error::NoStorageAccess(_)) => return Err(KeyStoreError::NotAvailable),
            Err(e) => return Err(KeyStoreError::Platform(e.to_string())),
        };
        decode_hex(&encoded).map(Some)
    }

    fn save(&self, key: &[u8]) -> Result<(), KeyStoreError> {
        let encoded: String = key.iter().map(|b| format!("{:02x}", b)).collect();
        self.entry()?
            .set_password(&encoded)
            .map_err(|e| KeyStoreError::Platform(e.to_string()))
    }

    fn delete(&self) -> Result<(), KeyStoreError> {
        match self.entry()?.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(KeyStoreError::Platform(e.to_string())),
        }
    }
}

fn decode_hex(encoded: &str) -> Result<Vec<u8>, KeyStoreError> {
    if encoded.len() % 2 != 0 || !encoded.is_ascii() {
        return Err(KeyStoreError::InvalidKey("odd-length hex".to_string()));
    }
    (0..encoded.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&encoded[i..i + 2], 16)
                .map_err(|e| KeyStoreError::InvalidKey(e.to_string()))
        })
        .collect()
}
