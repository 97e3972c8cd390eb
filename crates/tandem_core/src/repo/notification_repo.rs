//! Notification record repository.
//!
//! # Responsibility
//! - Persist dispatched notification records under `notification_<id>` keys
//!   for the in-app notification list.
//!
//! # Invariants
//! - Records are immutable once written; there is no update path.

use crate::model::notification::{NotificationId, NotificationRecord};
use crate::model::task::UserId;
use crate::repo::kv::KvStore;
use crate::repo::{RepoError, RepoResult};
use rusqlite::Connection;

const NOTIFICATION_KEY_PREFIX: &str = "notification_";

fn notification_key(id: NotificationId) -> String {
    format!("{NOTIFICATION_KEY_PREFIX}{id}")
}

/// Repository interface for notification history.
pub trait NotificationRepository {
    fn save(&self, record: &NotificationRecord) -> RepoResult<NotificationId>;
    /// All records addressed to `user_id`, most recently written first.
    fn get_all_for_user(&self, user_id: UserId) -> RepoResult<Vec<NotificationRecord>>;
    /// Removes one record. Idempotent.
    fn delete(&self, id: NotificationId) -> RepoResult<()>;
}

/// SQLite-backed notification repository over the canonical records table.
pub struct SqliteNotificationRepository<'conn> {
    kv: KvStore<'conn>,
}

impl<'conn> SqliteNotificationRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            kv: KvStore::new(conn),
        }
    }
}

impl NotificationRepository for SqliteNotificationRepository<'_> {
    fn save(&self, record: &NotificationRecord) -> RepoResult<NotificationId> {
        let value = serde_json::to_string(record).map_err(|err| {
            RepoError::InvalidData(format!(
                "notification {} failed to encode: {err}",
                record.id
            ))
        })?;
        self.kv.put(&notification_key(record.id), &value)?;
        Ok(record.id)
    }

    fn get_all_for_user(&self, user_id: UserId) -> RepoResult<Vec<NotificationRecord>> {
        let mut records = Vec::new();
        for value in self.kv.scan_prefix(NOTIFICATION_KEY_PREFIX)? {
            let record: NotificationRecord = serde_json::from_str(&value).map_err(|err| {
                RepoError::InvalidData(format!("undecodable notification record: {err}"))
            })?;
            if record.recipient_id == user_id {
                records.push(record);
            }
        }
        Ok(records)
    }

    fn delete(&self, id: NotificationId) -> RepoResult<()> {
        self.kv.delete(&notification_key(id))
    }
}
