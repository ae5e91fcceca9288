use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in the password vault.
#[derive(Debug, Error)]
pub enum VaultError {
    // --- Validation errors ---
    #[error("Key cannot be empty")]
    KeyEmpty,

    #[error("Secret cannot be empty")]
    SecretEmpty,

    #[error("Cannot process empty {0}")]
    EmptyInput(&'static str),

    #[error("{0} cannot be empty")]
    MissingArgument(String),

    // --- Record errors ---
    #[error("Key '{0}' not found")]
    KeyNotFound(String),

    #[error("Key '{0}' already exists (use `update` to change it)")]
    KeyExists(String),

    #[error("Record '{key}' is corrupted: {reason}")]
    CorruptRecord { key: String, reason: String },

    // --- Crypto errors ---
    #[error("Authentication failed — record was tampered with or encrypted under another key")]
    AuthenticationFailed,

    #[error("Secure random source unavailable: {0}")]
    RandomSource(String),

    #[error("Invalid cipher key: {0}")]
    InvalidKey(String),

    // --- Key file errors ---
    #[error("Key file not found at {0}")]
    KeyFileNotFound(PathBuf),

    #[error("Key file is corrupted: {0}")]
    KeyFileCorrupt(String),

    // --- Container errors ---
    #[error("Vault schema error: {0}")]
    Schema(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    // --- Lifecycle errors ---
    #[error("Restore declined — main vault file is missing")]
    RestoreDeclined,

    #[error("Backup file not found at {0}")]
    BackupMissing(PathBuf),

    #[error("Cannot resolve base directory: {0}")]
    BaseDirUnresolved(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    Config(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),
}

impl VaultError {
    /// `CorruptRecord` for `key` with a human-readable cause.
    pub fn corrupt(key: &str, reason: impl ToString) -> Self {
        Self::CorruptRecord {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Convenience type alias for vault results.
pub type Result<T> = std::result::Result<T, VaultError>;
