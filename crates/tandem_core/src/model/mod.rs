//! Domain model for tasks, users, and accountability partnerships.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Provide pure, value-to-value lifecycle transition functions.
//!
//! # Invariants
//! - Every domain object is identified by a stable UUID.
//! - Transition functions never mutate in place; each returns a new value
//!   with `updated_at` refreshed.
//! - Validation is reported as data and never panics.

use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

pub mod notification;
pub mod partnership;
pub mod task;
pub mod user;

/// Returns the current wall-clock time as Unix epoch milliseconds.
///
/// All domain timestamps use this resolution. Callers that need a stable
/// "now" across several checks should capture it once and pass it down to
/// the `*_at` predicate variants.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}

/// Outcome of boundary validation over user-supplied input.
///
/// Errors are plain-language strings surfaced verbatim to the UI layer,
/// so exact wording is part of the contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    /// Builds a report from collected error messages.
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }

    /// A report with no findings.
    pub fn valid() -> Self {
        Self::from_errors(Vec::new())
    }

    /// A report carrying a single error message.
    pub fn single(message: impl Into<String>) -> Self {
        Self::from_errors(vec![message.into()])
    }
}
