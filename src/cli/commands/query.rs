//! `pm query` — print a single password.

use crate::cli::{open_vault, require_arg, Cli};
use crate::errors::Result;

/// Execute the `query` command.
pub fn execute(cli: &Cli, key: Option<&str>) -> Result<()> {
    let key = require_arg(key, "Key")?;
    let (_, vault) = open_vault(cli)?;

    let record = vault.get(&key)?;
    if record.tag.is_empty() {
        println!("{}", record.secret);
    } else {
        println!("{}\t{}", record.secret, record.tag);
    }

    Ok(())
}
