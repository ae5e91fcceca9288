//! Vault module — encrypted record storage.
//!
//! This module provides:
//! - `Record` and the on-disk record encoding (`record`)
//! - The three-table container layout (`schema`)
//! - Transactional record operations via `VaultStore` (`store`)
//! - Startup, backup and restore of the vault files via `VaultManager` (`lifecycle`)

pub mod lifecycle;
pub mod record;
pub mod schema;
pub mod store;

// Re-export the most commonly used items.
pub use lifecycle::{
    Clock, ConfirmRestore, InitOutcome, SystemClock, Vault, VaultManager, VaultPaths,
    BACKUP_FILE_NAME, DEFAULT_BACKUP_INTERVAL_SECS, MAIN_FILE_NAME,
};
pub use record::{EncodedRecord, Record};
pub use store::VaultStore;
