//! Partnership repository contract and SQLite key-value implementation.
//!
//! # Responsibility
//! - Provide stable CRUD APIs over `partnership_<id>` records.
//! - Implement invite-code and by-user lookups as prefix scans with
//!   in-process filtering.
//!
//! # Invariants
//! - Write paths validate the partnership before persistence.
//! - Invite-code lookup is exact match on the stored uppercase code.

use crate::model::partnership::{Partnership, PartnershipId};
use crate::model::task::UserId;
use crate::repo::kv::KvStore;
use crate::repo::{ensure_valid, RepoError, RepoResult};
use rusqlite::Connection;

const PARTNERSHIP_KEY_PREFIX: &str = "partnership_";

fn partnership_key(id: PartnershipId) -> String {
    format!("{PARTNERSHIP_KEY_PREFIX}{id}")
}

/// Repository interface for partnership CRUD operations.
pub trait PartnershipRepository {
    fn save(&self, partnership: &Partnership) -> RepoResult<PartnershipId>;
    fn get_by_id(&self, id: PartnershipId) -> RepoResult<Option<Partnership>>;
    /// Looks up a partnership by its invite code, any status.
    fn get_by_invite_code(&self, code: &str) -> RepoResult<Option<Partnership>>;
    /// All partnerships where `user_id` occupies either side.
    fn get_all_for_user(&self, user_id: UserId) -> RepoResult<Vec<Partnership>>;
    /// Overwrites an existing partnership; `NotFound` when no record exists.
    fn update(&self, partnership: &Partnership) -> RepoResult<()>;
    /// Removes the partnership record. Idempotent.
    fn delete(&self, id: PartnershipId) -> RepoResult<()>;
}

/// SQLite-backed partnership repository over the canonical records table.
pub struct SqlitePartnershipRepository<'conn> {
    kv: KvStore<'conn>,
}

impl<'conn> SqlitePartnershipRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            kv: KvStore::new(conn),
        }
    }

    fn scan_all(&self) -> RepoResult<Vec<Partnership>> {
        self.kv
            .scan_prefix(PARTNERSHIP_KEY_PREFIX)?
            .iter()
            .map(|value| decode_partnership(value))
            .collect()
    }
}

impl PartnershipRepository for SqlitePartnershipRepository<'_> {
    fn save(&self, partnership: &Partnership) -> RepoResult<PartnershipId> {
        ensure_valid(partnership.validate())?;
        let value = encode_partnership(partnership)?;
        self.kv.put(&partnership_key(partnership.id), &value)?;
        Ok(partnership.id)
    }

    fn get_by_id(&self, id: PartnershipId) -> RepoResult<Option<Partnership>> {
        match self.kv.get(&partnership_key(id))? {
            Some(value) => Ok(Some(decode_partnership(&value)?)),
            None => Ok(None),
        }
    }

    fn get_by_invite_code(&self, code: &str) -> RepoResult<Option<Partnership>> {
        for partnership in self.scan_all()? {
            if partnership.invite_code == code {
                return Ok(Some(partnership));
            }
        }
        Ok(None)
    }

    fn get_all_for_user(&self, user_id: UserId) -> RepoResult<Vec<Partnership>> {
        let mut partnerships = self.scan_all()?;
        partnerships.retain(|partnership| partnership.involves(user_id));
        Ok(partnerships)
    }

    fn update(&self, partnership: &Partnership) -> RepoResult<()> {
        ensure_valid(partnership.validate())?;
        let key = partnership_key(partnership.id);
        if !self.kv.contains(&key)? {
            return Err(RepoError::NotFound(partnership.id));
        }
        let value = encode_partnership(partnership)?;
        self.kv.put(&key, &value)
    }

    fn delete(&self, id: PartnershipId) -> RepoResult<()> {
        self.kv.delete(&partnership_key(id))
    }
}

fn encode_partnership(partnership: &Partnership) -> RepoResult<String> {
    serde_json::to_string(partnership).map_err(|err| {
        RepoError::InvalidData(format!(
            "partnership {} failed to encode: {err}",
            partnership.id
        ))
    })
}

fn decode_partnership(value: &str) -> RepoResult<Partnership> {
    serde_json::from_str(value)
        .map_err(|err| RepoError::InvalidData(format!("undecodable partnership record: {err}")))
}
