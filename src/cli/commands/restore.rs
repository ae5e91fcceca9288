//! `pm restore` — overwrite the vault with the backup file.

use dialoguer::Confirm;

use crate::cli::output;
use crate::cli::{manager, Cli};
use crate::errors::{Result, VaultError};

/// Execute the `restore` command.
///
/// The vault is not opened here: the main file is replaced while nothing
/// holds it.
pub fn execute(cli: &Cli, force: bool) -> Result<()> {
    let manager = manager(cli)?;

    if !force {
        output::warning("Restoring replaces every password added or changed since the last backup.");
        let confirmed = Confirm::new()
            .with_prompt("Restore the vault from the backup?")
            .default(false)
            .interact()
            .map_err(|e| VaultError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    manager.restore()?;
    output::success(&format!(
        "Vault restored from {}",
        manager.paths().backup.display()
    ));

    Ok(())
}
