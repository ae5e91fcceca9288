//! Transactional record operations over one vault file.
//!
//! `VaultStore` wraps an SQLite connection holding the three vault tables
//! and a `Cipher`.  Every public operation runs as exactly one transaction,
//! so the records table and the tag-length table are always mutated
//! together: a crash can leave either the old state or the new one, never
//! a mix.

use std::collections::BTreeMap;
use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::{debug, warn};

use crate::crypto::Cipher;
use crate::errors::{Result, VaultError};

use super::record::{self, EncodedRecord, Record};
use super::schema;

/// The open vault.  Create one with `VaultStore::open` (file-backed) or
/// `VaultStore::in_memory` (tests), then use its methods to manage records.
pub struct VaultStore {
    conn: Connection,

    cipher: Box<dyn Cipher>,
}

impl VaultStore {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Open the vault file at `path`, creating any missing tables.
    ///
    /// The connection takes an exclusive lock on the file for as long as
    /// the store lives; a second process opening the same file fails with
    /// a database-busy error instead of interleaving writes.
    pub fn open(path: &Path, cipher: Box<dyn Cipher>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "locking_mode", "EXCLUSIVE")?;
        schema::create(&conn)?;

        debug!(path = %path.display(), "vault opened");
        Ok(Self { conn, cipher })
    }

    /// An initialized store that lives only in memory.
    pub fn in_memory(cipher: Box<dyn Cipher>) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::create(&conn)?;
        Ok(Self::from_connection(conn, cipher))
    }

    /// Wrap an existing connection as-is.  No tables are created, so
    /// operations on a connection that was never initialized fail with
    /// `VaultError::Schema`.
    pub fn from_connection(conn: Connection, cipher: Box<dyn Cipher>) -> Self {
        Self { conn, cipher }
    }

    // ------------------------------------------------------------------
    // Record operations
    // ------------------------------------------------------------------

    /// Add a new record.  Fails with `KeyExists` if `key` is taken.
    pub fn insert(&mut self, key: &str, secret: &str, tag: &str) -> Result<()> {
        if key.is_empty() {
            return Err(VaultError::KeyEmpty);
        }
        if secret.is_empty() {
            return Err(VaultError::SecretEmpty);
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        schema::require_record_tables(&tx)?;

        if record_exists(&tx, key)? {
            debug!(key, "insert rejected, key already set");
            return Err(VaultError::KeyExists(key.to_string()));
        }

        let encoded = record::encode(self.cipher.as_ref(), secret, tag)?;
        write_record(&tx, key, &encoded)?;
        tx.commit()?;

        debug!(key, "record inserted");
        Ok(())
    }

    /// Decrypt and return the record stored under `key`.
    pub fn get(&self, key: &str) -> Result<Record> {
        if key.is_empty() {
            return Err(VaultError::KeyEmpty);
        }

        let tx = self.conn.unchecked_transaction()?;
        schema::require_record_tables(&tx)?;
        read_record(&tx, self.cipher.as_ref(), key)
    }

    /// Decrypt every record, keyed and sorted by record key.
    ///
    /// All or nothing: if any record fails to decode the whole call fails
    /// with `CorruptRecord` and no partial map is returned.
    pub fn get_all(&self) -> Result<BTreeMap<String, Record>> {
        let tx = self.conn.unchecked_transaction()?;
        schema::require_record_tables(&tx)?;

        let mut stmt = tx.prepare(
            "SELECT p.key, p.value, l.value
             FROM passwords p
             LEFT JOIN \"platformsLen\" l ON l.key = p.key",
        )?;
        // Column values are fetched per key so a mistyped cell is reported
        // against the record it belongs to.
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Vec<u8>>(1),
                row.get::<_, Option<String>>(2),
            ))
        })?;

        let mut records = BTreeMap::new();
        for row in rows {
            let (key, blob, raw_len) = row?;
            let decoded = blob
                .and_then(|blob| raw_len.map(|raw_len| (blob, raw_len)))
                .map_err(|e| VaultError::corrupt(&key, e))
                .and_then(|(blob, raw_len)| {
                    let tag_len = tag_len_or_legacy(&key, raw_len.as_deref())?;
                    record::decode(self.cipher.as_ref(), &key, &blob, tag_len)
                });

            match decoded {
                Ok(rec) => {
                    records.insert(key, rec);
                }
                Err(e @ VaultError::CorruptRecord { .. }) => return Err(e),
                Err(e) => return Err(VaultError::corrupt(&key, e)),
            }
        }

        Ok(records)
    }

    /// Decrypt every record, then keep those whose tag contains `needle`.
    ///
    /// Every record is decoded, so one corrupt record fails the search
    /// just like `get_all`, whether or not its tag matches.
    pub fn find_by_tag(&self, needle: &str) -> Result<BTreeMap<String, Record>> {
        Ok(self
            .get_all()?
            .into_iter()
            .filter(|(_, record)| record.tag.contains(needle))
            .collect())
    }

    /// Change a record's secret, tag, and/or key.
    ///
    /// Empty arguments mean "leave unchanged", so a tag cannot be cleared
    /// through this call.  A non-empty `new_key` renames the record: it is
    /// written under `new_key` and removed from `key` in the same
    /// transaction.  Renaming onto another existing key fails with
    /// `KeyExists`.
    pub fn update(&mut self, key: &str, new_secret: &str, new_tag: &str, new_key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(VaultError::KeyEmpty);
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        schema::require_record_tables(&tx)?;

        let existing = read_record(&tx, self.cipher.as_ref(), key)?;

        let secret = if new_secret.is_empty() {
            existing.secret.as_str()
        } else {
            new_secret
        };
        let tag = if new_tag.is_empty() {
            existing.tag.as_str()
        } else {
            new_tag
        };
        let target = if new_key.is_empty() { key } else { new_key };

        if target != key && record_exists(&tx, target)? {
            return Err(VaultError::KeyExists(target.to_string()));
        }

        let encoded = record::encode(self.cipher.as_ref(), secret, tag)?;
        write_record(&tx, target, &encoded)?;
        if target != key {
            delete_record(&tx, key)?;
        }
        tx.commit()?;

        if target != key {
            debug!(from = key, to = target, "record renamed");
        } else {
            debug!(key, "record updated");
        }
        Ok(())
    }

    /// Remove the record stored under `key`.
    pub fn delete(&mut self, key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(VaultError::KeyEmpty);
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        schema::require_record_tables(&tx)?;

        if !record_exists(&tx, key)? {
            return Err(VaultError::KeyNotFound(key.to_string()));
        }
        delete_record(&tx, key)?;
        tx.commit()?;

        debug!(key, "record deleted");
        Ok(())
    }

    /// Returns `true` if a record is stored under `key`.
    ///
    /// Metadata-only: nothing is decrypted.
    pub fn contains_key(&self, key: &str) -> Result<bool> {
        schema::require_record_tables(&self.conn)?;
        record_exists(&self.conn, key)
    }

    /// Number of records in the vault.
    pub fn len(&self) -> Result<usize> {
        schema::require_record_tables(&self.conn)?;
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM passwords", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    // ------------------------------------------------------------------
    // Backup timestamp
    // ------------------------------------------------------------------

    /// Unix time of the last recorded backup, or `None` if never set.
    ///
    /// An unreadable value is treated as absent so the next startup takes
    /// a fresh backup and overwrites it.
    pub fn last_backup(&self) -> Result<Option<i64>> {
        if !schema::table_exists(&self.conn, schema::TIMESTAMP_TABLE)? {
            return Ok(None);
        }
        read_timestamp(&self.conn)
    }

    /// Store `now` as the backup timestamp, never moving it backwards.
    ///
    /// Returns the value actually stored.
    pub fn record_timestamp(&mut self, now: i64) -> Result<i64> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        if !schema::table_exists(&tx, schema::TIMESTAMP_TABLE)? {
            schema::create(&tx)?;
        }

        let stored = read_timestamp(&tx)?;
        let value = stored.map_or(now, |previous| previous.max(now));

        let key = schema::timestamp_key();
        tx.execute(
            "INSERT OR REPLACE INTO time_stamp_bucket (key, value) VALUES (?1, ?2)",
            params![&key[..], value.to_string()],
        )?;
        tx.commit()?;

        debug!(timestamp = value, "backup timestamp saved");
        Ok(value)
    }
}

// ----------------------------------------------------------------------
// Row helpers.  All take a `&Connection` so they run inside whatever
// transaction the caller holds.
// ----------------------------------------------------------------------

fn record_exists(conn: &Connection, key: &str) -> Result<bool> {
    let found = conn
        .query_row("SELECT 1 FROM passwords WHERE key = ?1", [key], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

fn read_record(conn: &Connection, cipher: &dyn Cipher, key: &str) -> Result<Record> {
    let blob = conn
        .query_row("SELECT value FROM passwords WHERE key = ?1", [key], |row| {
            Ok(row.get::<_, Vec<u8>>(0))
        })
        .optional()?
        .ok_or_else(|| VaultError::KeyNotFound(key.to_string()))?
        .map_err(|e| VaultError::corrupt(key, e))?;

    let raw_len = conn
        .query_row(
            "SELECT value FROM \"platformsLen\" WHERE key = ?1",
            [key],
            |row| Ok(row.get::<_, String>(0)),
        )
        .optional()?
        .transpose()
        .map_err(|e| VaultError::corrupt(key, e))?;
    let tag_len = tag_len_or_legacy(key, raw_len.as_deref())?;

    record::decode(cipher, key, &blob, tag_len)
}

/// Records written by the secret-only schema have no tag-length row;
/// they carry no tag.
fn tag_len_or_legacy(key: &str, raw: Option<&str>) -> Result<usize> {
    match raw {
        Some(raw) => record::parse_tag_len(key, raw),
        None => Ok(0),
    }
}

fn write_record(conn: &Connection, key: &str, encoded: &EncodedRecord) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO passwords (key, value) VALUES (?1, ?2)",
        params![key, encoded.value],
    )?;
    conn.execute(
        "INSERT OR REPLACE INTO \"platformsLen\" (key, value) VALUES (?1, ?2)",
        params![key, encoded.tag_len],
    )?;
    Ok(())
}

fn delete_record(conn: &Connection, key: &str) -> Result<()> {
    conn.execute("DELETE FROM passwords WHERE key = ?1", [key])?;
    conn.execute("DELETE FROM \"platformsLen\" WHERE key = ?1", [key])?;
    Ok(())
}

fn read_timestamp(conn: &Connection) -> Result<Option<i64>> {
    let key = schema::timestamp_key();
    let raw: Option<String> = conn
        .query_row(
            "SELECT value FROM time_stamp_bucket WHERE key = ?1",
            [&key[..]],
            |row| row.get(0),
        )
        .optional()?;

    Ok(raw.and_then(|raw| match raw.parse::<i64>() {
        Ok(ts) => Some(ts),
        Err(_) => {
            warn!(value = %raw, "ignoring unreadable backup timestamp");
            None
        }
    }))
}
