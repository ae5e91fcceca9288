//! `pm pla` — list passwords by platform.

use crate::cli::output;
use crate::cli::{open_vault, require_arg, Cli};
use crate::errors::Result;

/// Execute the `pla` command.
pub fn execute(cli: &Cli, tag: Option<&str>) -> Result<()> {
    let needle = require_arg(tag, "Platform")?;
    let (_, vault) = open_vault(cli)?;

    let records = vault.find_by_tag(&needle)?;
    if records.is_empty() {
        output::info(&format!("No passwords with a platform matching '{needle}'."));
        return Ok(());
    }

    output::info(&format!("{} password(s) matching '{needle}'", records.len()));
    output::print_records_table(&records);

    Ok(())
}
