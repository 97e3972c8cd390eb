//! Key-value record access over the canonical `records` table.
//!
//! # Responsibility
//! - Provide put/get/delete/scan primitives shared by every entity
//!   repository.
//! - Keep SQL details out of the entity repositories.
//!
//! # Invariants
//! - Keys are entity-type prefixed (`task_<id>`, `user_<id>`, ...).
//! - `put` is last-write-wins; there is no optimistic concurrency check.
//! - Prefix scans return values ordered by write recency, then key.

use crate::repo::RepoResult;
use rusqlite::{params, Connection, OptionalExtension};

/// Thin cursor over the `records` table.
pub struct KvStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> KvStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Writes `value` under `key`, overwriting any previous record.
    pub fn put(&self, key: &str, value: &str) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO records (key, value)
             VALUES (?1, ?2)
             ON CONFLICT (key) DO UPDATE SET
                value = excluded.value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![key, value],
        )?;
        Ok(())
    }

    /// Reads the value stored under `key`, or `None` if absent.
    pub fn get(&self, key: &str) -> RepoResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM records WHERE key = ?1;",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Whether a record exists under `key`.
    pub fn contains(&self, key: &str) -> RepoResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Removes the record under `key`. Deleting a missing key is not an
    /// error.
    pub fn delete(&self, key: &str) -> RepoResult<()> {
        self.conn
            .execute("DELETE FROM records WHERE key = ?1;", params![key])?;
        Ok(())
    }

    /// Returns all values whose key starts with `prefix`, most recently
    /// written first.
    ///
    /// GLOB rather than LIKE: entity prefixes contain `_`, which LIKE
    /// treats as a wildcard.
    pub fn scan_prefix(&self, prefix: &str) -> RepoResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT value FROM records
             WHERE key GLOB ?1 || '*'
             ORDER BY updated_at DESC, key ASC;",
        )?;
        let mut rows = stmt.query(params![prefix])?;
        let mut values = Vec::new();
        while let Some(row) = rows.next()? {
            values.push(row.get::<_, String>(0)?);
        }
        Ok(values)
    }
}
