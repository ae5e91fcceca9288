use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{Result, VaultError};
use crate::vault::DEFAULT_BACKUP_INTERVAL_SECS;

/// Vault configuration, loaded from `pm.toml`.
///
/// Every field has a sensible default so the vault works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Seconds that must pass since the vault was last opened before
    /// startup takes another automatic backup.
    #[serde(default = "default_backup_interval_secs")]
    pub backup_interval_secs: u64,

    /// Whether startup takes automatic backups at all.
    #[serde(default = "default_auto_backup")]
    pub auto_backup: bool,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_backup_interval_secs() -> u64 {
    DEFAULT_BACKUP_INTERVAL_SECS.unsigned_abs()
}

fn default_auto_backup() -> bool {
    true
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            backup_interval_secs: default_backup_interval_secs(),
            auto_backup: default_auto_backup(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the base directory.
    const FILE_NAME: &'static str = "pm.toml";

    /// Load settings from `<base_dir>/pm.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(base_dir: &Path) -> Result<Self> {
        let config_path = Self::path(base_dir);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            VaultError::Config(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        Ok(settings)
    }

    /// Full path of the config file for a base directory.
    pub fn path(base_dir: &Path) -> PathBuf {
        base_dir.join(Self::FILE_NAME)
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_settings_are_sensible() {
        let s = Settings::default();
        assert_eq!(s.backup_interval_secs, 500);
        assert!(s.auto_backup);
    }

    #[test]
    fn load_returns_defaults_when_no_config_file() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.backup_interval_secs, 500);
    }

    #[test]
    fn load_parses_toml_file() {
        let tmp = TempDir::new().unwrap();
        let config = r#"
backup_interval_secs = 3600
auto_backup = false
"#;
        fs::write(tmp.path().join("pm.toml"), config).unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.backup_interval_secs, 3600);
        assert!(!settings.auto_backup);
    }

    #[test]
    fn load_uses_defaults_for_missing_fields() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("pm.toml"), "auto_backup = false\n").unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert!(!settings.auto_backup);
        assert_eq!(settings.backup_interval_secs, 500);
    }

    #[test]
    fn load_errors_on_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("pm.toml"), "not valid {{toml").unwrap();

        assert!(matches!(
            Settings::load(tmp.path()),
            Err(VaultError::Config(_))
        ));
    }

    #[test]
    fn load_errors_on_negative_interval() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("pm.toml"), "backup_interval_secs = -5\n").unwrap();
        assert!(Settings::load(tmp.path()).is_err());
    }
}
