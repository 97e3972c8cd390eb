//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts per entity type.
//! - Map entity CRUD onto key-value records in local SQLite storage.
//!
//! # Invariants
//! - Repository writes validate the entity before touching storage.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Absence is `Ok(None)`, never an error; `delete` is idempotent.

use crate::db::DbError;
use crate::model::ValidationReport;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod kv;
pub mod notification_repo;
pub mod partnership_repo;
pub mod task_repo;
pub mod user_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for entity persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Entity failed validation before a write.
    Validation(ValidationReport),
    /// Underlying storage failure.
    Db(DbError),
    /// Target record does not exist (update paths only).
    NotFound(Uuid),
    /// Persisted record cannot be decoded into a valid entity.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(report) => {
                write!(f, "validation failed: {}", report.errors.join("; "))
            }
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted record: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Fails a write when the entity's validation report carries findings.
pub(crate) fn ensure_valid(report: ValidationReport) -> RepoResult<()> {
    if report.is_valid {
        Ok(())
    } else {
        Err(RepoError::Validation(report))
    }
}
