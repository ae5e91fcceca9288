//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use std::collections::BTreeMap;

use chrono::{Local, TimeZone};
use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::vault::Record;

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print records as a table (Key, Platform, Password), sorted by key.
pub fn print_records_table(records: &BTreeMap<String, Record>) {
    if records.is_empty() {
        info("No passwords stored yet.");
        tip("Run `pm add <KEY>` to add your first password.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Key", "Platform", "Password"]);

    for (key, record) in records {
        table.add_row(vec![key.as_str(), record.tag.as_str(), record.secret.as_str()]);
    }

    println!("{table}");
}

/// Print when the last backup was taken, in local time.
pub fn last_backup(unix_secs: i64) {
    info(&format!("Last backup: {}", format_timestamp(unix_secs)));
}

/// Local `YYYY-MM-DD HH:MM:SS`, or the raw number if it is out of range.
pub fn format_timestamp(unix_secs: i64) -> String {
    match Local.timestamp_opt(unix_secs, 0).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => unix_secs.to_string(),
    }
}
