//! The vault's symmetric key and the file that holds it.
//!
//! The key is 16 random bytes, machine generated on first run and stored
//! hex-encoded in `key.gob` next to the vault.  That file is the single
//! root of trust: losing it makes every record unrecoverable.

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use rand::TryRngCore;
use tracing::{debug, error, info};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::errors::{Result, VaultError};

/// Length of the symmetric key in bytes (AES-128).
pub const KEY_LEN: usize = 16;

/// Default name of the key file inside the base directory.
pub const KEY_FILE_NAME: &str = "key.gob";

/// A 16-byte symmetric key whose memory is wiped when dropped.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey {
    bytes: [u8; KEY_LEN],
}

impl SymmetricKey {
    /// Wrap raw key bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Access the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Lowercase hex form used on disk.
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.bytes))
    }

    /// Parse the on-disk hex form.
    pub fn from_hex(encoded: &str) -> Result<Self> {
        if encoded.is_empty() {
            return Err(VaultError::KeyFileCorrupt("key is empty".into()));
        }
        let raw = Zeroizing::new(
            hex::decode(encoded).map_err(|e| VaultError::KeyFileCorrupt(format!("bad hex: {e}")))?,
        );
        let bytes: [u8; KEY_LEN] = raw.as_slice().try_into().map_err(|_| {
            VaultError::KeyFileCorrupt(format!("expected {KEY_LEN} key bytes, got {}", raw.len()))
        })?;
        Ok(Self { bytes })
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey(<redacted>)")
    }
}

/// Generates, persists and loads the vault key.
pub trait KeyCustodian {
    /// Mint a fresh key from the OS random source.
    fn generate(&self) -> Result<SymmetricKey>;

    /// Write `key` to durable storage, replacing any previous key.
    fn persist(&self, key: &SymmetricKey) -> Result<()>;

    /// Read the previously persisted key.
    fn load(&self) -> Result<SymmetricKey>;
}

/// Fill a new key from the operating system's CSPRNG.
pub fn generate_key() -> Result<SymmetricKey> {
    let mut bytes = [0u8; KEY_LEN];
    rand::rngs::OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| VaultError::RandomSource(e.to_string()))?;
    let key = SymmetricKey::new(bytes);
    bytes.zeroize();
    Ok(key)
}

/// Key custodian backed by a single file.
///
/// The file holds the hex key serialized as one JSON string and is
/// written with owner-only permissions.
#[derive(Debug, Clone)]
pub struct KeyFile {
    path: PathBuf,
}

impl KeyFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<base_dir>/key.gob`
    pub fn in_dir(base_dir: &Path) -> Self {
        Self::new(base_dir.join(KEY_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyCustodian for KeyFile {
    fn generate(&self) -> Result<SymmetricKey> {
        generate_key()
    }

    fn persist(&self, key: &SymmetricKey) -> Result<()> {
        let hex = key.to_hex();
        let encoded = Zeroizing::new(
            serde_json::to_vec(hex.as_str())
                .map_err(|e| VaultError::KeyFileCorrupt(format!("cannot encode key: {e}")))?,
        );

        let write = || -> io::Result<()> {
            let mut file = crate::fs::create_private_file(&self.path)?;
            file.write_all(&encoded)?;
            file.sync_all()
        };
        write().map_err(|e| {
            error!(path = %self.path.display(), "failed to write key file: {e}");
            VaultError::Io(e)
        })?;

        info!(path = %self.path.display(), "key saved");
        Ok(())
    }

    fn load(&self) -> Result<SymmetricKey> {
        let data = match fs::read(&self.path) {
            Ok(data) => Zeroizing::new(data),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(VaultError::KeyFileNotFound(self.path.clone()));
            }
            Err(e) => return Err(VaultError::Io(e)),
        };

        let hex: Zeroizing<String> = Zeroizing::new(
            serde_json::from_slice(&data)
                .map_err(|e| VaultError::KeyFileCorrupt(format!("cannot decode key file: {e}")))?,
        );
        let key = SymmetricKey::from_hex(&hex)?;

        debug!(path = %self.path.display(), "key loaded");
        Ok(key)
    }
}
