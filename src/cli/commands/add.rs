//! `pm add` — store a new password.

use std::io::{self, IsTerminal};

use crate::cli::output;
use crate::cli::{backup_after_change, open_vault, optional_input, read_secret, require_arg, Cli};
use crate::errors::Result;

/// Execute the `add` command.
pub fn execute(cli: &Cli, key: Option<&str>, tag: Option<&str>) -> Result<()> {
    let key = require_arg(key, "Key")?;

    // Secret comes from piped stdin or a hidden prompt, never from argv.
    let secret = read_secret(&format!("Password for {key}"), false)?;

    let tag = match tag {
        Some(t) => t.to_string(),
        None if io::stdin().is_terminal() => optional_input("Platform (optional)")?,
        None => String::new(),
    };

    let (manager, mut vault) = open_vault(cli)?;
    vault.insert(&key, &secret, &tag)?;
    let total = vault.len()?;
    drop(vault);

    output::success(&format!("Password '{key}' added ({total} total)"));
    backup_after_change(&manager)?;

    Ok(())
}
