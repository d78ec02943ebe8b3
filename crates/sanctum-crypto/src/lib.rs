//! Sanctum Crypto - symmetric encryption layer
//!
//! This crate provides:
//! - ChaCha20-Poly1305 authenticated encryption with a fresh nonce per call
//! - The `KeyStore` seam for persisting raw key material
//! - `KeyManager`, which owns the single device key for a key epoch
//! - OS keychain integration

pub mod cipher;
pub mod keychain;
pub mod manager;

pub use cipher::{CipherError, KEY_SIZE, NONCE_SIZE};
pub use keychain::{KeyStore, KeyStoreError, KeychainKeyStore};
pub use manager::KeyManager;
