//! `pm list` — display all passwords in a table.

use crate::cli::output;
use crate::cli::{open_vault, Cli};
use crate::errors::Result;

/// Execute the `list` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let (_, vault) = open_vault(cli)?;

    let records = vault.get_all()?;
    output::info(&format!("{} password(s)", records.len()));
    output::print_records_table(&records);

    Ok(())
}
