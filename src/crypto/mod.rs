//! Cryptographic primitives for the vault.
//!
//! This module provides:
//! - AES-128-GCM encryption and decryption behind the `Cipher` trait (`cipher`)
//! - The symmetric key and its on-disk custodian (`keys`)

pub mod cipher;
pub mod keys;

pub use cipher::{AesGcmCipher, Cipher, NONCE_LEN, TAG_LEN};
pub use keys::{generate_key, KeyCustodian, KeyFile, SymmetricKey, KEY_FILE_NAME, KEY_LEN};
