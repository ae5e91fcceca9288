//! `pm del` — remove a password from the vault.

use dialoguer::Confirm;

use crate::cli::output;
use crate::cli::{backup_after_change, open_vault, require_arg, Cli};
use crate::errors::{Result, VaultError};

/// Execute the `del` command.
pub fn execute(cli: &Cli, key: Option<&str>, force: bool) -> Result<()> {
    let key = require_arg(key, "Key")?;

    // Unless --force is set, ask for confirmation before deleting.
    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete password '{key}'?"))
            .default(false)
            .interact()
            .map_err(|e| VaultError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    let (manager, mut vault) = open_vault(cli)?;
    vault.delete(&key)?;
    drop(vault);

    output::success(&format!("Deleted password '{key}'"));
    backup_after_change(&manager)?;

    Ok(())
}
