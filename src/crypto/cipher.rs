//! AES-128-GCM authenticated encryption of single secret values.
//!
//! Every call to `encrypt` draws a fresh random 12-byte nonce and hands it
//! back next to the ciphertext; callers never choose their own.  The
//! ciphertext carries the 16-byte GCM authentication tag at its end:
//!
//! ```text
//!   ciphertext = [ encrypted plaintext | 16-byte auth tag ]
//! ```

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes128Gcm, Nonce};
use tracing::error;

use super::keys::{SymmetricKey, KEY_LEN};
use crate::errors::{Result, VaultError};

/// Size of the AES-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Size of the GCM authentication tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;

/// Authenticated encryption of one value at a time.
///
/// The production implementation is [`AesGcmCipher`]; tests substitute
/// their own to exercise the store without real cryptography.
pub trait Cipher {
    /// Encrypt `plaintext`, returning `(ciphertext, nonce)`.
    fn encrypt(&self, plaintext: &[u8]) -> Result<(Vec<u8>, Vec<u8>)>;

    /// Decrypt `ciphertext` with the exact nonce produced by `encrypt`.
    fn decrypt(&self, ciphertext: &[u8], nonce: &[u8]) -> Result<Vec<u8>>;
}

/// AES-128-GCM keyed by the vault's [`SymmetricKey`].
pub struct AesGcmCipher {
    cipher: Aes128Gcm,
}

impl AesGcmCipher {
    /// Build the cipher from a symmetric key.
    pub fn new(key: &SymmetricKey) -> Result<Self> {
        Self::from_slice(key.as_bytes())
    }

    /// Build the cipher from raw key bytes.
    ///
    /// A key whose length is not exactly 16 bytes is a configuration error.
    pub fn from_slice(key: &[u8]) -> Result<Self> {
        let cipher = Aes128Gcm::new_from_slice(key).map_err(|_| {
            VaultError::InvalidKey(format!("expected {KEY_LEN} bytes, got {}", key.len()))
        })?;
        Ok(Self { cipher })
    }
}

impl Cipher for AesGcmCipher {
    fn encrypt(&self, plaintext: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
        if plaintext.is_empty() {
            return Err(VaultError::EmptyInput("plaintext"));
        }

        let nonce = Aes128Gcm::generate_nonce(&mut OsRng);

        let ciphertext = self.cipher.encrypt(&nonce, plaintext).map_err(|e| {
            error!("aes-gcm seal failed: {e}");
            VaultError::AuthenticationFailed
        })?;

        Ok((ciphertext, nonce.to_vec()))
    }

    fn decrypt(&self, ciphertext: &[u8], nonce: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.is_empty() {
            return Err(VaultError::EmptyInput("ciphertext"));
        }
        if nonce.is_empty() {
            return Err(VaultError::EmptyInput("nonce"));
        }
        // `Nonce::from_slice` panics on a wrong length.
        if nonce.len() != NONCE_LEN {
            return Err(VaultError::AuthenticationFailed);
        }

        self.cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| VaultError::AuthenticationFailed)
    }
}
