//! The three-table layout shared by the main and backup vault files.
//!
//! | table               | key                      | value                    |
//! |---------------------|--------------------------|--------------------------|
//! | `passwords`         | record key               | encoded record blob      |
//! | `platformsLen`      | record key               | decimal tag length       |
//! | `time_stamp_bucket` | SHA-256 of `time-stamp`  | decimal Unix seconds     |

use rusqlite::{Connection, OptionalExtension};
use sha2::{Digest, Sha256};

use crate::errors::{Result, VaultError};

pub const RECORDS_TABLE: &str = "passwords";
pub const TAG_LEN_TABLE: &str = "platformsLen";
pub const TIMESTAMP_TABLE: &str = "time_stamp_bucket";

/// Plain-text name hashed to form the timestamp row key.
const TIMESTAMP_KEY_NAME: &[u8] = b"time-stamp";

/// Create any missing tables.  Idempotent.
pub fn create(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS passwords (
            key   TEXT PRIMARY KEY NOT NULL,
            value BLOB NOT NULL
        );
        CREATE TABLE IF NOT EXISTS \"platformsLen\" (
            key   TEXT PRIMARY KEY NOT NULL,
            value TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS time_stamp_bucket (
            key   BLOB PRIMARY KEY NOT NULL,
            value TEXT NOT NULL
        );",
    )?;
    Ok(())
}

/// Fail with `Schema` unless both record tables exist.
pub fn require_record_tables(conn: &Connection) -> Result<()> {
    for table in [RECORDS_TABLE, TAG_LEN_TABLE] {
        if !table_exists(conn, table)? {
            return Err(VaultError::Schema(format!(
                "table '{table}' is missing — vault was not initialized"
            )));
        }
    }
    Ok(())
}

pub fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Row key of the backup timestamp singleton.
pub fn timestamp_key() -> [u8; 32] {
    let digest = Sha256::digest(TIMESTAMP_KEY_NAME);
    let mut key = [0u8; 32];
    key.copy_from_slice(&digest);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        create(&conn).unwrap();
        create(&conn).unwrap();
        for table in [RECORDS_TABLE, TAG_LEN_TABLE, TIMESTAMP_TABLE] {
            assert!(table_exists(&conn, table).unwrap(), "{table} missing");
        }
    }

    #[test]
    fn missing_tables_are_a_schema_error() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(matches!(
            require_record_tables(&conn),
            Err(VaultError::Schema(_))
        ));
    }

    #[test]
    fn timestamp_key_is_sha256_of_name() {
        assert_eq!(
            hex::encode(timestamp_key()),
            "402cdef40bcd44bcf7b3dbc0573e40ce4f55587713e8a5555fab4601a6869b8c"
        );
    }
}
