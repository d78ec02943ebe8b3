use sanctum_crypto::{cipher, KeyManager, KeyStore, KeyStoreError};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct SharedSlot {
    raw: Mutex<Option<Vec<u8>>>,
}

impl KeyStore for SharedSlot {
    fn load(&self) -> Result<Option<Vec<u8>>, KeyStoreError> {
        Ok(self.raw.lock().unwrap().clone())
    }
    fn save(&self, key: &[u8]) -> Result<(), KeyStoreError> {
        *self.raw.lock().unwrap() = Some(key.to_vec());
        Ok(())
    }
    fn delete(&self) -> Result<(), KeyStoreError> {
        self.raw.lock().unwrap().take();
        Ok(())
    }
}

#[test]
fn same_epoch_across_managers() {
    let slot = Arc::new(SharedSlot::default());

    let first = KeyManager::new(slot.clone());
    first.ensure_key().unwrap();
    let (nonce, ciphertext) = cipher::encrypt(&first.current().unwrap()[..], b"mood 4").unwrap();

    // a second process importing the stored key reads the same data
    let second = KeyManager::new(slot);
    second.ensure_key().unwrap();
    let plaintext = cipher::decrypt(&second.current().unwrap()[..], &nonce, &ciphertext).unwrap();
    assert_eq!(plaintext.as_slice(), b"mood 4");
}

#[test]
fn cleared_key_ends_the_epoch() {
    let slot = Arc::new(SharedSlot::default());
    let manager = KeyManager::new(slot);
    manager.ensure_key().unwrap();
    let (nonce, ciphertext) = cipher::encrypt(&manager.current().unwrap()[..], b"journal").unwrap();

    manager.clear().unwrap();
    assert!(!manager.has_key());
    assert!(manager.current().is_none());

    manager.ensure_key().unwrap();
    assert!(cipher::decrypt(&manager.current().unwrap()[..], &nonce, &ciphertext).is_err());
}
