//! Device key manager
//!
//! Holds the one symmetric key used for every record in a key epoch.
//! The key is wrapped in `Zeroizing<>` so it's scrubbed from memory on drop.
//! Key absence is an explicit state: nothing here generates a key behind
//! the caller's back, `ensure_key` must be called first.

use ring::rand::SecureRandom;
use std::sync::{Arc, RwLock};
use zeroize::Zeroizing;

use crate::cipher::KEY_SIZE;
use crate::keychain::{KeyStore, KeyStoreError};

pub struct KeyManager {
    store: Arc<dyn KeyStore>,
    key: RwLock<Option<Zeroizing<[u8; KEY_SIZE]>>>,
}

impl KeyManager {
    pub fn new(store: Arc<dyn KeyStore>) -> Self {
        Self {
            store,
            key: RwLock::new(None),
        }
    }

    /// Import the stored key, or generate and persist a new one.
    ///
    /// Calling this while a key is already loaded is a no-op.
    pub fn ensure_key(&self) -> Result<(), KeyStoreError> {
        let mut slot = self.key.write().unwrap_or_else(|e| e.into_inner());
        if slot.is_some() {
            return Ok(());
        }

        if let Some(raw) = self.store.load()? {
            if raw.len() != KEY_SIZE {
                return Err(KeyStoreError::InvalidKey(format!(
                    "expected {} bytes, got {}",
                    KEY_SIZE,
                    raw.len()
                )));
            }
            let mut key = Zeroizing::new([0u8; KEY_SIZE]);
            key.copy_from_slice(&raw);
            *slot = Some(key);
            tracing::debug!("Imported stored device key");
            return Ok(());
        }

        let mut key = Zeroizing::new([0u8; KEY_SIZE]);
        ring::rand::SystemRandom::new()
            .fill(&mut key[..])
            .map_err(|_| KeyStoreError::Generation)?;
        self.store.save(&*key)?;
        *slot = Some(key);
        tracing::info!("Generated new device key");
        Ok(())
    }

    pub fn has_key(&self) -> bool {
        self.key.read().unwrap_or_else(|e| e.into_inner()).is_some()
    }

    /// Copy of the current key, `None` until `ensure_key` succeeds.
    pub fn current(&self) -> Option<Zeroizing<[u8; KEY_SIZE]>> {
        self.key
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|k| Zeroizing::new(**k))
    }

    /// Forget the key in memory and delete the stored material.
    ///
    /// Anything encrypted under it becomes permanently unreadable.
    pub fn clear(&self) -> Result<(), KeyStoreError> {
        self.key.write().unwrap_or_else(|e| e.into_inner()).take();
        self.store.delete()?;
        tracing::info!("Device key cleared");
        Ok(())
    }
}
