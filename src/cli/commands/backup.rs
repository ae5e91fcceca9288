//! `pm backup` — copy the vault to the backup file now.

use crate::cli::output;
use crate::cli::{open_vault, Cli};
use crate::errors::{Result, VaultError};

/// Execute the `backup` command.
pub fn execute(cli: &Cli, verify: bool) -> Result<()> {
    let (manager, vault) = open_vault(cli)?;

    manager.backup()?;
    output::success(&format!(
        "Backup written to {}",
        manager.paths().backup.display()
    ));

    if verify {
        let expected = vault.get_all()?;
        let actual = manager.open_backup()?.get_all()?;
        if actual != expected {
            return Err(VaultError::CommandFailed(
                "backup does not match the vault".into(),
            ));
        }
        output::success(&format!("Backup verified ({} password(s))", actual.len()));
    }

    Ok(())
}
