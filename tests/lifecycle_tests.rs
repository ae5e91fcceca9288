//! Integration tests for startup, recovery and backups.

use std::fs;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use pwvault::config::Settings;
use pwvault::crypto::{generate_key, KeyCustodian, SymmetricKey};
use pwvault::errors::{Result, VaultError};
use pwvault::vault::{Clock, InitOutcome, Record, VaultManager, VaultPaths};
use tempfile::TempDir;

const T0: i64 = 1_700_000_000;

/// A clock the test moves by hand.
#[derive(Clone)]
struct ManualClock(Arc<AtomicI64>);

impl ManualClock {
    fn at(now: i64) -> Self {
        Self(Arc::new(AtomicI64::new(now)))
    }

    fn set(&self, now: i64) {
        self.0.store(now, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Keeps the key in memory instead of a key file.
#[derive(Clone, Default)]
struct MemoryCustodian(Arc<Mutex<Option<SymmetricKey>>>);

impl KeyCustodian for MemoryCustodian {
    fn generate(&self) -> Result<SymmetricKey> {
        generate_key()
    }

    fn persist(&self, key: &SymmetricKey) -> Result<()> {
        *self.0.lock().unwrap() = Some(key.clone());
        Ok(())
    }

    fn load(&self) -> Result<SymmetricKey> {
        self.0
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| VaultError::KeyFileNotFound("memory".into()))
    }
}

/// A custodian whose random source is gone.
struct NoEntropy;

impl KeyCustodian for NoEntropy {
    fn generate(&self) -> Result<SymmetricKey> {
        Err(VaultError::RandomSource("entropy pool unavailable".into()))
    }

    fn persist(&self, _key: &SymmetricKey) -> Result<()> {
        panic!("nothing to persist without a key");
    }

    fn load(&self) -> Result<SymmetricKey> {
        Err(VaultError::KeyFileNotFound("none".into()))
    }
}

fn manager(dir: &TempDir, clock: &ManualClock) -> VaultManager {
    VaultManager::new(VaultPaths::new(dir.path())).with_clock(Box::new(clock.clone()))
}

fn yes() -> bool {
    true
}

fn no() -> bool {
    false
}

// ---------------------------------------------------------------------------
// First run
// ---------------------------------------------------------------------------

#[test]
fn first_run_creates_both_files_and_key() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::at(T0);
    let manager = manager(&dir, &clock);

    let vault = manager.initialize(&yes).unwrap();
    assert_eq!(vault.outcome(), InitOutcome::Created);
    assert_eq!(vault.last_backup().unwrap(), Some(T0));
    assert!(vault.is_empty().unwrap());

    let paths = manager.paths();
    assert!(paths.main.exists());
    assert!(paths.backup.exists());
    assert!(paths.key.exists());
}

#[test]
fn first_run_creates_missing_base_dir() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("a").join("b");
    let manager = VaultManager::new(VaultPaths::new(&nested));

    manager.initialize(&yes).unwrap();
    assert!(nested.join("data.db").exists());
}

#[test]
fn fresh_backup_is_an_empty_vault() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::at(T0);
    let manager = manager(&dir, &clock);
    drop(manager.initialize(&yes).unwrap());

    let backup = manager.open_backup().unwrap();
    assert!(backup.get_all().unwrap().is_empty());
}

#[test]
fn injected_custodian_replaces_key_file() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::at(T0);
    let custodian = MemoryCustodian::default();
    let manager = manager(&dir, &clock).with_custodian(Box::new(custodian.clone()));

    let mut vault = manager.initialize(&yes).unwrap();
    vault.insert("a", "s", "T").unwrap();
    drop(vault);

    assert!(!manager.paths().key.exists());
    assert!(custodian.0.lock().unwrap().is_some());

    let vault = manager.initialize(&yes).unwrap();
    assert_eq!(vault.get("a").unwrap(), Record::new("s", "T"));
}

#[test]
fn missing_entropy_fails_first_run_without_side_effects() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::at(T0);
    let manager = manager(&dir, &clock).with_custodian(Box::new(NoEntropy));

    assert!(matches!(
        manager.initialize(&yes),
        Err(VaultError::RandomSource(_))
    ));
    let paths = manager.paths();
    assert!(!paths.key.exists());
    assert!(!paths.main.exists());
    assert!(!paths.backup.exists());
}

// ---------------------------------------------------------------------------
// Backup gating
// ---------------------------------------------------------------------------

#[test]
fn reopen_within_interval_skips_backup() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::at(T0);
    let manager = manager(&dir, &clock);

    let mut vault = manager.initialize(&yes).unwrap();
    vault.insert("a", "s", "").unwrap();
    drop(vault);

    clock.set(T0 + 499);
    let vault = manager.initialize(&yes).unwrap();
    assert_eq!(
        vault.outcome(),
        InitOutcome::Opened {
            last_backup: Some(T0),
            backed_up: false
        }
    );
    assert!(manager.open_backup().unwrap().get_all().unwrap().is_empty());
}

#[test]
fn reopen_after_interval_takes_backup() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::at(T0);
    let manager = manager(&dir, &clock);

    let mut vault = manager.initialize(&yes).unwrap();
    vault.insert("a", "s", "T").unwrap();
    drop(vault);

    clock.set(T0 + 500);
    let vault = manager.initialize(&yes).unwrap();
    assert_eq!(
        vault.outcome(),
        InitOutcome::Opened {
            last_backup: Some(T0),
            backed_up: true
        }
    );
    assert_eq!(vault.last_backup().unwrap(), Some(T0 + 500));

    let backup = manager.open_backup().unwrap();
    assert_eq!(backup.get("a").unwrap(), Record::new("s", "T"));
}

#[test]
fn timestamp_never_moves_backwards() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::at(T0);
    let manager = manager(&dir, &clock);
    drop(manager.initialize(&yes).unwrap());

    clock.set(T0 - 1_000);
    let vault = manager.initialize(&yes).unwrap();
    assert_eq!(vault.last_backup().unwrap(), Some(T0));
}

#[test]
fn custom_interval_from_settings() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::at(T0);
    let settings = Settings {
        backup_interval_secs: 10,
        auto_backup: true,
    };
    let manager = manager(&dir, &clock).with_settings(&settings);
    drop(manager.initialize(&yes).unwrap());

    clock.set(T0 + 10);
    let vault = manager.initialize(&yes).unwrap();
    assert!(matches!(
        vault.outcome(),
        InitOutcome::Opened { backed_up: true, .. }
    ));
}

#[test]
fn auto_backup_off_never_backs_up() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::at(T0);
    let settings = Settings {
        backup_interval_secs: 1,
        auto_backup: false,
    };
    let manager = manager(&dir, &clock).with_settings(&settings);
    drop(manager.initialize(&yes).unwrap());

    clock.set(T0 + 100_000);
    let vault = manager.initialize(&yes).unwrap();
    assert!(matches!(
        vault.outcome(),
        InitOutcome::Opened { backed_up: false, .. }
    ));
}

// ---------------------------------------------------------------------------
// Explicit backup and restore
// ---------------------------------------------------------------------------

#[test]
fn backup_then_open_backup_matches_vault() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::at(T0);
    let manager = manager(&dir, &clock);

    let mut vault = manager.initialize(&yes).unwrap();
    vault.insert("a", "1", "A").unwrap();
    vault.insert("b", "2", "").unwrap();
    manager.backup().unwrap();

    let expected = vault.get_all().unwrap();
    let actual = manager.open_backup().unwrap().get_all().unwrap();
    assert_eq!(actual, expected);
}

#[test]
fn restore_rolls_back_to_last_backup() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::at(T0);
    let manager = manager(&dir, &clock);

    let mut vault = manager.initialize(&yes).unwrap();
    vault.insert("kept", "1", "").unwrap();
    manager.backup().unwrap();
    vault.insert("lost", "2", "").unwrap();
    drop(vault);

    manager.restore().unwrap();

    let vault = manager.initialize(&no).unwrap();
    assert!(vault.contains_key("kept").unwrap());
    assert!(!vault.contains_key("lost").unwrap());
}

#[test]
fn restore_removes_stale_journal() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::at(T0);
    let manager = manager(&dir, &clock);
    drop(manager.initialize(&yes).unwrap());

    let journal = manager.paths().main_journal();
    fs::write(&journal, b"stale").unwrap();

    manager.restore().unwrap();
    assert!(!journal.exists());
    assert!(manager.paths().main.exists());
}

#[test]
fn failed_restore_keeps_main_vault() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::at(T0);
    let manager = manager(&dir, &clock);

    let mut vault = manager.initialize(&yes).unwrap();
    vault.insert("a", "s", "T").unwrap();
    drop(vault);

    // A directory in place of the backup file makes the copy fail.
    fs::remove_file(&manager.paths().backup).unwrap();
    fs::create_dir(&manager.paths().backup).unwrap();

    assert!(matches!(manager.restore(), Err(VaultError::Io(_))));
    assert!(manager.paths().main.exists());

    let vault = manager.initialize(&no).unwrap();
    assert_eq!(vault.get("a").unwrap(), Record::new("s", "T"));
}

#[test]
fn restore_without_backup_fails() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::at(T0);
    let manager = manager(&dir, &clock);
    drop(manager.initialize(&yes).unwrap());
    fs::remove_file(&manager.paths().backup).unwrap();

    assert!(matches!(
        manager.restore(),
        Err(VaultError::BackupMissing(_))
    ));
    assert!(matches!(
        manager.open_backup(),
        Err(VaultError::BackupMissing(_))
    ));
}

// ---------------------------------------------------------------------------
// Recovery when the main file is gone
// ---------------------------------------------------------------------------

#[test]
fn missing_main_is_restored_when_confirmed() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::at(T0);
    let manager = manager(&dir, &clock);

    let mut vault = manager.initialize(&yes).unwrap();
    vault.insert("a", "s", "T").unwrap();
    manager.backup().unwrap();
    drop(vault);
    fs::remove_file(&manager.paths().main).unwrap();

    let vault = manager.initialize(&yes).unwrap();
    assert_eq!(vault.outcome(), InitOutcome::Restored);
    assert_eq!(vault.get("a").unwrap(), Record::new("s", "T"));
}

#[test]
fn declined_restore_leaves_main_missing() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::at(T0);
    let manager = manager(&dir, &clock);
    drop(manager.initialize(&yes).unwrap());
    fs::remove_file(&manager.paths().main).unwrap();

    assert!(matches!(
        manager.initialize(&no),
        Err(VaultError::RestoreDeclined)
    ));
    assert!(!manager.paths().main.exists());
    assert!(manager.paths().backup.exists());
}

#[test]
fn missing_key_file_fails_open() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::at(T0);
    let manager = manager(&dir, &clock);
    drop(manager.initialize(&yes).unwrap());
    fs::remove_file(&manager.paths().key).unwrap();

    assert!(matches!(
        manager.initialize(&yes),
        Err(VaultError::KeyFileNotFound(_))
    ));
}
