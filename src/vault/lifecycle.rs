//! Opening, creating, recovering and backing up the vault files.
//!
//! Startup is decided once, by which files exist in the base directory:
//!
//! | `data.db` | `data.backup.db` | action                                        |
//! |-----------|------------------|-----------------------------------------------|
//! | yes       | any              | open; take a backup if the last one is stale  |
//! | no        | yes              | ask before restoring the backup, then open    |
//! | no        | no               | first run: create both files and a fresh key  |
//!
//! Backups are whole-file copies of `data.db`.  Every committed
//! transaction is fully contained in that file, so the copy is always a
//! consistent snapshot.

use std::fs;
use std::io;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::crypto::{AesGcmCipher, KeyCustodian, KeyFile, KEY_FILE_NAME};
use crate::errors::{Result, VaultError};
use crate::fs::{copy_private, create_private_file, remove_if_exists};

use super::schema;
use super::store::VaultStore;

/// File name of the main vault inside the base directory.
pub const MAIN_FILE_NAME: &str = "data.db";

/// File name of the backup vault inside the base directory.
pub const BACKUP_FILE_NAME: &str = "data.backup.db";

/// Minimum age, in seconds, of the last backup before startup takes a new one.
pub const DEFAULT_BACKUP_INTERVAL_SECS: i64 = 500;

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// Where the vault's files live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultPaths {
    pub base_dir: PathBuf,
    pub main: PathBuf,
    pub backup: PathBuf,
    pub key: PathBuf,
}

impl VaultPaths {
    /// Standard layout under `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            main: base_dir.join(MAIN_FILE_NAME),
            backup: base_dir.join(BACKUP_FILE_NAME),
            key: base_dir.join(KEY_FILE_NAME),
            base_dir,
        }
    }

    /// Use `explicit` if given, otherwise the directory of the running
    /// executable.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(dir) = explicit {
            return Ok(Self::new(dir));
        }

        let exe = std::env::current_exe().map_err(|e| {
            error!("can't get executable path: {e}");
            VaultError::BaseDirUnresolved(e.to_string())
        })?;
        let dir = exe.parent().ok_or_else(|| {
            VaultError::BaseDirUnresolved(format!("{} has no parent directory", exe.display()))
        })?;
        Ok(Self::new(dir))
    }

    /// SQLite's rollback journal beside the main file.
    pub fn main_journal(&self) -> PathBuf {
        let mut name = self.main.as_os_str().to_owned();
        name.push("-journal");
        PathBuf::from(name)
    }
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Source of the current Unix time, in seconds.
pub trait Clock {
    fn now(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Asked once before the backup is copied over a missing main file.
pub trait ConfirmRestore {
    fn confirm_restore(&self) -> bool;
}

impl<F> ConfirmRestore for F
where
    F: Fn() -> bool,
{
    fn confirm_restore(&self) -> bool {
        self()
    }
}

// ---------------------------------------------------------------------------
// Startup result
// ---------------------------------------------------------------------------

/// What `VaultManager::initialize` had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// The main file was opened.  `last_backup` is the timestamp found in
    /// it; `backed_up` tells whether the interval had elapsed.
    Opened {
        last_backup: Option<i64>,
        backed_up: bool,
    },
    /// The main file was missing and was restored from the backup.
    Restored,
    /// First run: both files and the key were created.
    Created,
}

/// An initialized vault.  Dereferences to its `VaultStore`.
pub struct Vault {
    store: VaultStore,
    outcome: InitOutcome,
}

impl Vault {
    pub fn outcome(&self) -> InitOutcome {
        self.outcome
    }
}

impl Deref for Vault {
    type Target = VaultStore;

    fn deref(&self) -> &VaultStore {
        &self.store
    }
}

impl DerefMut for Vault {
    fn deref_mut(&mut self) -> &mut VaultStore {
        &mut self.store
    }
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

/// Owns the vault files and decides how to bring the vault up.
pub struct VaultManager {
    paths: VaultPaths,
    custodian: Box<dyn KeyCustodian>,
    clock: Box<dyn Clock>,
    backup_interval: i64,
    auto_backup: bool,
}

impl VaultManager {
    /// Manager over `paths` with the key file at `paths.key`, the system
    /// clock and the default 500 s backup interval.
    pub fn new(paths: VaultPaths) -> Self {
        let custodian = KeyFile::new(paths.key.clone());
        Self {
            paths,
            custodian: Box::new(custodian),
            clock: Box::new(SystemClock),
            backup_interval: DEFAULT_BACKUP_INTERVAL_SECS,
            auto_backup: true,
        }
    }

    pub fn with_custodian(mut self, custodian: Box<dyn KeyCustodian>) -> Self {
        self.custodian = custodian;
        self
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Apply the backup settings from `pm.toml`.
    pub fn with_settings(mut self, settings: &Settings) -> Self {
        self.backup_interval = i64::try_from(settings.backup_interval_secs).unwrap_or(i64::MAX);
        self.auto_backup = settings.auto_backup;
        self
    }

    pub fn paths(&self) -> &VaultPaths {
        &self.paths
    }

    // ------------------------------------------------------------------
    // Startup
    // ------------------------------------------------------------------

    /// Open, recover or create the vault.
    ///
    /// `confirm` is consulted only when the main file is missing but a
    /// backup exists.  Any filesystem failure is returned as-is; nothing
    /// is retried.
    pub fn initialize(&self, confirm: &dyn ConfirmRestore) -> Result<Vault> {
        let main_exists = self.paths.main.try_exists()?;
        let backup_exists = self.paths.backup.try_exists()?;

        match (main_exists, backup_exists) {
            (true, _) => self.open_existing(),
            (false, true) => self.recover(confirm),
            (false, false) => self.create_fresh(),
        }
    }

    fn open_existing(&self) -> Result<Vault> {
        let mut store = self.open_main()?;

        let last_backup = store.last_backup()?;
        let now = self.clock.now();
        let due = self.auto_backup
            && last_backup.map_or(true, |last| now >= last.saturating_add(self.backup_interval));

        if due {
            info!(?last_backup, now, "backup interval elapsed, backing up");
            self.backup()?;
        } else {
            debug!(?last_backup, now, "backup not due");
        }

        // Marks when the vault was last touched; the next gate measures from here.
        store.record_timestamp(now)?;

        Ok(Vault {
            store,
            outcome: InitOutcome::Opened {
                last_backup,
                backed_up: due,
            },
        })
    }

    fn recover(&self, confirm: &dyn ConfirmRestore) -> Result<Vault> {
        warn!(
            main = %self.paths.main.display(),
            backup = %self.paths.backup.display(),
            "main vault file not found, backup is available"
        );

        if !confirm.confirm_restore() {
            info!("restore declined");
            return Err(VaultError::RestoreDeclined);
        }

        self.copy_backup_over_main()?;

        let mut store = self.open_main()?;
        store.record_timestamp(self.clock.now())?;

        info!("vault restored from backup");
        Ok(Vault {
            store,
            outcome: InitOutcome::Restored,
        })
    }

    fn create_fresh(&self) -> Result<Vault> {
        info!(dir = %self.paths.base_dir.display(), "no vault found, initializing");

        fs::create_dir_all(&self.paths.base_dir).map_err(|e| {
            error!(dir = %self.paths.base_dir.display(), "cannot create base directory: {e}");
            VaultError::Io(e)
        })?;

        // Mint the key before touching any vault file so a missing entropy
        // source leaves the directory as it was.
        let key = self.custodian.generate()?;

        for path in [&self.paths.main, &self.paths.backup] {
            create_private_file(path).map_err(|e| {
                error!(path = %path.display(), "create vault file failed: {e}");
                VaultError::Io(e)
            })?;
        }

        // The backup starts out as an empty but valid vault.
        {
            let conn = Connection::open(&self.paths.backup)?;
            schema::create(&conn)?;
        }

        self.custodian.persist(&key)?;

        let cipher = AesGcmCipher::new(&key)?;
        let mut store = VaultStore::open(&self.paths.main, Box::new(cipher))?;
        store.record_timestamp(self.clock.now())?;

        info!("vault and backup files created");
        Ok(Vault {
            store,
            outcome: InitOutcome::Created,
        })
    }

    // ------------------------------------------------------------------
    // Backup and restore
    // ------------------------------------------------------------------

    /// Replace the backup with a byte-for-byte copy of the main file.
    pub fn backup(&self) -> Result<()> {
        debug!("backup begin");
        if !self.paths.main.try_exists()? {
            return Err(VaultError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("main vault file not found at {}", self.paths.main.display()),
            )));
        }

        replace_with_copy(&self.paths.main, &self.paths.backup).map_err(|e| {
            error!("failed to copy vault to backup: {e}");
            VaultError::Io(e)
        })?;

        info!(backup = %self.paths.backup.display(), "backup written");
        Ok(())
    }

    /// Overwrite the main file with the backup.
    ///
    /// Must not be called while a `Vault` on the same files is open.
    pub fn restore(&self) -> Result<()> {
        if !self.paths.backup.try_exists()? {
            return Err(VaultError::BackupMissing(self.paths.backup.clone()));
        }
        self.copy_backup_over_main()?;
        info!(main = %self.paths.main.display(), "main vault restored from backup");
        Ok(())
    }

    /// Open the backup file as a store of its own.
    pub fn open_backup(&self) -> Result<VaultStore> {
        if !self.paths.backup.try_exists()? {
            return Err(VaultError::BackupMissing(self.paths.backup.clone()));
        }
        let key = self.custodian.load()?;
        let cipher = AesGcmCipher::new(&key)?;
        VaultStore::open(&self.paths.backup, Box::new(cipher))
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn open_main(&self) -> Result<VaultStore> {
        let key = self.custodian.load()?;
        let cipher = AesGcmCipher::new(&key)?;
        VaultStore::open(&self.paths.main, Box::new(cipher))
    }

    /// Copy the backup next to the main file, drop the stale journal, then
    /// rename the copy over the main file.  Until the rename the old main
    /// file is untouched.
    fn copy_backup_over_main(&self) -> Result<()> {
        let journal = self.paths.main_journal();
        replace_with_copy_then(&self.paths.backup, &self.paths.main, || {
            remove_if_exists(&journal)
        })
        .map_err(|e| {
            error!("failed to restore main vault from backup: {e}");
            VaultError::Io(e)
        })
    }
}

/// Copy `src` next to `dst` under a temporary name, then rename it into
/// place so `dst` is never observed half-written.
fn replace_with_copy(src: &Path, dst: &Path) -> io::Result<()> {
    replace_with_copy_then(src, dst, || Ok(()))
}

/// `replace_with_copy`, running `before_rename` once the copy is complete.
/// Any failure removes the temporary copy and leaves `dst` as it was.
fn replace_with_copy_then<F>(src: &Path, dst: &Path, before_rename: F) -> io::Result<()>
where
    F: FnOnce() -> io::Result<()>,
{
    let parent = dst.parent().unwrap_or(Path::new("."));
    let tmp = parent.join(format!(
        ".{}.tmp",
        dst.file_name().unwrap_or_default().to_string_lossy()
    ));

    let result = copy_private(src, &tmp)
        .and_then(|_| before_rename())
        .and_then(|_| fs::rename(&tmp, dst));
    if result.is_err() {
        let _ = remove_if_exists(&tmp);
    }
    result
}
