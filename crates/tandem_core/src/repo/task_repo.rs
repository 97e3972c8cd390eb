//! Task repository contract and SQLite key-value implementation.
//!
//! # Responsibility
//! - Provide stable CRUD APIs over `task_<id>` records.
//! - Implement secondary lookups (by owner, by partnership) as prefix scans
//!   with in-process filtering.
//!
//! # Invariants
//! - Write paths validate the task before persistence.
//! - Read paths reject undecodable or invalid persisted state.

use crate::model::partnership::Partnership;
use crate::model::task::{Task, TaskId, UserId};
use crate::repo::kv::KvStore;
use crate::repo::{ensure_valid, RepoError, RepoResult};
use rusqlite::Connection;

const TASK_KEY_PREFIX: &str = "task_";

fn task_key(id: TaskId) -> String {
    format!("{TASK_KEY_PREFIX}{id}")
}

/// Repository interface for task CRUD operations.
pub trait TaskRepository {
    /// Persists a task under its id, overwriting any previous record.
    fn save(&self, task: &Task) -> RepoResult<TaskId>;
    /// Returns the task or `None` if absent.
    fn get_by_id(&self, id: TaskId) -> RepoResult<Option<Task>>;
    /// All tasks owned by `user_id`, most recently written first.
    fn get_all_for_user(&self, user_id: UserId) -> RepoResult<Vec<Task>>;
    /// All tasks assigned between the two parties of `partnership`.
    fn get_all_for_partnership(&self, partnership: &Partnership) -> RepoResult<Vec<Task>>;
    /// Overwrites an existing task; `NotFound` when no record exists.
    fn update(&self, task: &Task) -> RepoResult<()>;
    /// Removes the task record. Idempotent.
    fn delete(&self, id: TaskId) -> RepoResult<()>;
}

/// SQLite-backed task repository over the canonical records table.
pub struct SqliteTaskRepository<'conn> {
    kv: KvStore<'conn>,
}

impl<'conn> SqliteTaskRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            kv: KvStore::new(conn),
        }
    }

    fn scan_all(&self) -> RepoResult<Vec<Task>> {
        self.kv
            .scan_prefix(TASK_KEY_PREFIX)?
            .iter()
            .map(|value| decode_task(value))
            .collect()
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn save(&self, task: &Task) -> RepoResult<TaskId> {
        ensure_valid(task.validate())?;
        let value = encode_task(task)?;
        self.kv.put(&task_key(task.id), &value)?;
        Ok(task.id)
    }

    fn get_by_id(&self, id: TaskId) -> RepoResult<Option<Task>> {
        match self.kv.get(&task_key(id))? {
            Some(value) => Ok(Some(decode_task(&value)?)),
            None => Ok(None),
        }
    }

    fn get_all_for_user(&self, user_id: UserId) -> RepoResult<Vec<Task>> {
        let mut tasks = self.scan_all()?;
        tasks.retain(|task| task.user_id == user_id);
        Ok(tasks)
    }

    fn get_all_for_partnership(&self, partnership: &Partnership) -> RepoResult<Vec<Task>> {
        let (Some(adhd_user), Some(partner)) = (partnership.adhd_user_id, partnership.partner_id)
        else {
            return Ok(Vec::new());
        };
        let mut tasks = self.scan_all()?;
        tasks.retain(|task| {
            (task.user_id == adhd_user && task.assigned_by == Some(partner))
                || (task.user_id == partner && task.assigned_by == Some(adhd_user))
        });
        Ok(tasks)
    }

    fn update(&self, task: &Task) -> RepoResult<()> {
        ensure_valid(task.validate())?;
        let key = task_key(task.id);
        if !self.kv.contains(&key)? {
            return Err(RepoError::NotFound(task.id));
        }
        let value = encode_task(task)?;
        self.kv.put(&key, &value)
    }

    fn delete(&self, id: TaskId) -> RepoResult<()> {
        self.kv.delete(&task_key(id))
    }
}

fn encode_task(task: &Task) -> RepoResult<String> {
    serde_json::to_string(task)
        .map_err(|err| RepoError::InvalidData(format!("task {} failed to encode: {err}", task.id)))
}

fn decode_task(value: &str) -> RepoResult<Task> {
    let task: Task = serde_json::from_str(value)
        .map_err(|err| RepoError::InvalidData(format!("undecodable task record: {err}")))?;
    let report = task.validate();
    if !report.is_valid {
        return Err(RepoError::InvalidData(format!(
            "task {} violates invariants: {}",
            task.id,
            report.errors.join("; ")
        )));
    }
    Ok(task)
}
