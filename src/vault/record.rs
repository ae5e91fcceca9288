//! Records and their on-disk encoding.
//!
//! A record's protected fields are stored as one blob:
//!
//! ```text
//! [ tag bytes | 12-byte nonce | ciphertext + 16-byte auth tag ]
//! ```
//!
//! The tag stays in the clear so records can be listed and searched by tag
//! without decrypting them.  Its length has no in-band terminator, so it is
//! kept in a sibling table as a decimal ASCII string.

use crate::crypto::{Cipher, NONCE_LEN};
use crate::errors::{Result, VaultError};

/// A decrypted record: the protected secret and its optional tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub secret: String,
    /// Free-text label such as a platform name; may be empty.
    pub tag: String,
}

impl Record {
    pub fn new(secret: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            tag: tag.into(),
        }
    }
}

/// A record ready to be written: the value blob plus its tag length.
#[derive(Debug, Clone)]
pub struct EncodedRecord {
    pub value: Vec<u8>,
    /// Decimal ASCII length of the tag prefix in `value`.
    pub tag_len: String,
}

/// Encrypt `secret` and lay it out behind `tag`.
pub fn encode(cipher: &dyn Cipher, secret: &str, tag: &str) -> Result<EncodedRecord> {
    if secret.is_empty() {
        return Err(VaultError::SecretEmpty);
    }

    let (ciphertext, nonce) = cipher.encrypt(secret.as_bytes())?;

    let tag_bytes = tag.as_bytes();
    let mut value = Vec::with_capacity(tag_bytes.len() + nonce.len() + ciphertext.len());
    value.extend_from_slice(tag_bytes);
    value.extend_from_slice(&nonce);
    value.extend_from_slice(&ciphertext);

    Ok(EncodedRecord {
        value,
        tag_len: tag_bytes.len().to_string(),
    })
}

/// Split `blob` at `tag_len` and decrypt the remainder.
///
/// Layout problems are reported as `CorruptRecord`; a failed
/// authentication tag is reported as `AuthenticationFailed`.
pub fn decode(cipher: &dyn Cipher, key: &str, blob: &[u8], tag_len: usize) -> Result<Record> {
    if tag_len > blob.len() {
        return Err(VaultError::corrupt(
            key,
            format!("tag length {tag_len} exceeds value length {}", blob.len()),
        ));
    }
    let (tag_bytes, sealed) = blob.split_at(tag_len);

    if sealed.len() <= NONCE_LEN {
        return Err(VaultError::corrupt(
            key,
            "value too short to hold a nonce and ciphertext",
        ));
    }
    let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);

    let plaintext = cipher.decrypt(ciphertext, nonce)?;

    let secret = String::from_utf8(plaintext)
        .map_err(|_| VaultError::corrupt(key, "secret is not valid UTF-8"))?;
    let tag = String::from_utf8(tag_bytes.to_vec())
        .map_err(|_| VaultError::corrupt(key, "tag is not valid UTF-8"))?;

    Ok(Record { secret, tag })
}

/// Parse a stored tag length.
pub fn parse_tag_len(key: &str, raw: &str) -> Result<usize> {
    raw.parse::<usize>()
        .map_err(|_| VaultError::corrupt(key, format!("invalid tag length '{raw}'")))
}
