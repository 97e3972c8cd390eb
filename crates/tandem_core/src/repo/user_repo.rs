//! User repository contract and SQLite key-value implementation.
//!
//! # Responsibility
//! - Provide stable CRUD APIs over `user_<id>` records.
//! - Implement email lookup as a prefix scan with in-process filtering.
//!
//! # Invariants
//! - Write paths validate the user before persistence.
//! - Email comparison is case-insensitive.

use crate::model::task::UserId;
use crate::model::user::User;
use crate::repo::kv::KvStore;
use crate::repo::{ensure_valid, RepoError, RepoResult};
use rusqlite::Connection;

const USER_KEY_PREFIX: &str = "user_";

fn user_key(id: UserId) -> String {
    format!("{USER_KEY_PREFIX}{id}")
}

/// Repository interface for user CRUD operations.
pub trait UserRepository {
    fn save(&self, user: &User) -> RepoResult<UserId>;
    fn get_by_id(&self, id: UserId) -> RepoResult<Option<User>>;
    fn get_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    /// Overwrites an existing user; `NotFound` when no record exists.
    fn update(&self, user: &User) -> RepoResult<()>;
    /// Removes the user record. Idempotent.
    fn delete(&self, id: UserId) -> RepoResult<()>;
}

/// SQLite-backed user repository over the canonical records table.
pub struct SqliteUserRepository<'conn> {
    kv: KvStore<'conn>,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            kv: KvStore::new(conn),
        }
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn save(&self, user: &User) -> RepoResult<UserId> {
        ensure_valid(user.validate())?;
        let value = encode_user(user)?;
        self.kv.put(&user_key(user.id), &value)?;
        Ok(user.id)
    }

    fn get_by_id(&self, id: UserId) -> RepoResult<Option<User>> {
        match self.kv.get(&user_key(id))? {
            Some(value) => Ok(Some(decode_user(&value)?)),
            None => Ok(None),
        }
    }

    fn get_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let needle = email.trim().to_ascii_lowercase();
        for value in self.kv.scan_prefix(USER_KEY_PREFIX)? {
            let user = decode_user(&value)?;
            if user.email.to_ascii_lowercase() == needle {
                return Ok(Some(user));
            }
        }
        Ok(None)
    }

    fn update(&self, user: &User) -> RepoResult<()> {
        ensure_valid(user.validate())?;
        let key = user_key(user.id);
        if !self.kv.contains(&key)? {
            return Err(RepoError::NotFound(user.id));
        }
        let value = encode_user(user)?;
        self.kv.put(&key, &value)
    }

    fn delete(&self, id: UserId) -> RepoResult<()> {
        self.kv.delete(&user_key(id))
    }
}

fn encode_user(user: &User) -> RepoResult<String> {
    serde_json::to_string(user)
        .map_err(|err| RepoError::InvalidData(format!("user {} failed to encode: {err}", user.id)))
}

fn decode_user(value: &str) -> RepoResult<User> {
    serde_json::from_str(value)
        .map_err(|err| RepoError::InvalidData(format!("undecodable user record: {err}")))
}
