//! Task domain model and lifecycle transitions.
//!
//! # Responsibility
//! - Define the canonical task record shared by owner and partner flows.
//! - Provide pure transition functions (start, complete, assign, encourage,
//!   partner-notification marks).
//! - Validate untyped task input at the UI boundary.
//!
//! # Invariants
//! - `completed == true` iff `status == Completed` iff `completed_at` is set.
//! - "Overdue" is a derived predicate, never stored.
//! - `encouragement_received` is append-only; transitions never drop entries.

use crate::model::{now_epoch_ms, ValidationReport};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Stable identifier for a task.
pub type TaskId = Uuid;
/// Stable identifier for a user. Shared with the user model.
pub type UserId = Uuid;

/// XP awarded by `Task::complete` when the caller does not supply a value.
pub const DEFAULT_COMPLETION_XP: u32 = 10;

/// Task lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created but not started.
    Pending,
    /// Work is in progress.
    InProgress,
    /// Completed successfully.
    Completed,
}

/// Task priority, used for list ordering and reminder urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

/// Which partner-notification flag a transition should set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartnerNotifyKind {
    OnStart,
    OnComplete,
    OnOverdue,
}

/// Per-task record of which partner notifications were already sent.
///
/// Three independent booleans, not an enum: more than one can be true over
/// the task's lifetime (started, then overdue, then completed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PartnerNotified {
    pub on_start: bool,
    pub on_complete: bool,
    pub on_overdue: bool,
}

/// One encouragement message a partner attached to this task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encouragement {
    pub message: String,
    pub from_user_id: UserId,
    /// Unix epoch milliseconds at append time.
    pub timestamp: i64,
}

/// Creation input for `Task::create`.
///
/// Title is required by the type but not validated here; blank-title checks
/// belong to boundary validation so UI copy stays in one place.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub user_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub priority: TaskPriority,
    pub time_estimate_minutes: Option<u32>,
    pub due_date: Option<i64>,
    pub preferred_start_time: Option<i64>,
}

/// Canonical task record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub priority: TaskPriority,
    /// Estimated effort in minutes.
    pub time_estimate_minutes: Option<u32>,
    pub status: TaskStatus,
    /// Redundant with `status` for quick checks; kept in lockstep by the
    /// transition functions.
    pub completed: bool,
    pub completed_at: Option<i64>,
    pub started_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
    /// Owner of the task.
    pub user_id: UserId,
    /// Partner who assigned this task, when it came through the
    /// assignment flow.
    pub assigned_by: Option<UserId>,
    pub assigned_to: Option<UserId>,
    pub due_date: Option<i64>,
    pub preferred_start_time: Option<i64>,
    /// Set only on completion.
    pub xp_earned: u32,
    /// Accumulated focus time in minutes.
    pub time_spent_minutes: u32,
    pub partner_notified: PartnerNotified,
    pub encouragement_received: Vec<Encouragement>,
}

impl Task {
    /// Creates a task with defaults filled in.
    ///
    /// # Invariants
    /// - `status = Pending`, `completed = false`, `xp_earned = 0`.
    /// - All partner-notification flags start false.
    /// - `encouragement_received` starts empty.
    pub fn create(input: NewTask) -> Self {
        let now = now_epoch_ms();
        Self {
            id: Uuid::new_v4(),
            title: input.title,
            description: input.description,
            category: input.category,
            priority: input.priority,
            time_estimate_minutes: input.time_estimate_minutes,
            status: TaskStatus::Pending,
            completed: false,
            completed_at: None,
            started_at: None,
            created_at: now,
            updated_at: now,
            user_id: input.user_id,
            assigned_by: None,
            assigned_to: None,
            due_date: input.due_date,
            preferred_start_time: input.preferred_start_time,
            xp_earned: 0,
            time_spent_minutes: 0,
            partner_notified: PartnerNotified::default(),
            encouragement_received: Vec::new(),
        }
    }

    /// Validates the typed record before persistence.
    ///
    /// The title-absent case cannot occur on a typed `Task`, so only the
    /// blank-title message is reachable here; `validate_task_input` covers
    /// the full boundary rules.
    pub fn validate(&self) -> ValidationReport {
        let mut errors = Vec::new();
        if self.title.trim().is_empty() {
            errors.push(ERR_TITLE_EMPTY.to_string());
        }
        ValidationReport::from_errors(errors)
    }

    /// Marks the task as started.
    pub fn start(mut self) -> Self {
        let now = now_epoch_ms();
        self.status = TaskStatus::InProgress;
        self.started_at = Some(now);
        self.updated_at = now;
        self
    }

    /// Marks the task as completed and records the awarded XP.
    ///
    /// Keeps `completed`, `status`, and `completed_at` in lockstep.
    pub fn complete(mut self, xp_earned: u32) -> Self {
        let now = now_epoch_ms();
        self.completed = true;
        self.status = TaskStatus::Completed;
        self.completed_at = Some(now);
        self.xp_earned = xp_earned;
        self.updated_at = now;
        self
    }

    /// Records a partner assignment. Does not change lifecycle status.
    pub fn assign(
        mut self,
        assigned_by: UserId,
        assigned_to: UserId,
        due_date: Option<i64>,
        preferred_start_time: Option<i64>,
    ) -> Self {
        self.assigned_by = Some(assigned_by);
        self.assigned_to = Some(assigned_to);
        self.due_date = due_date;
        self.preferred_start_time = preferred_start_time;
        self.updated_at = now_epoch_ms();
        self
    }

    /// Appends one encouragement entry. Prior entries are never replaced.
    pub fn add_encouragement(mut self, message: impl Into<String>, from_user_id: UserId) -> Self {
        let now = now_epoch_ms();
        self.encouragement_received.push(Encouragement {
            message: message.into(),
            from_user_id,
            timestamp: now,
        });
        self.updated_at = now;
        self
    }

    /// Sets one partner-notification flag, leaving the other two untouched.
    pub fn mark_partner_notified(mut self, kind: PartnerNotifyKind) -> Self {
        match kind {
            PartnerNotifyKind::OnStart => self.partner_notified.on_start = true,
            PartnerNotifyKind::OnComplete => self.partner_notified.on_complete = true,
            PartnerNotifyKind::OnOverdue => self.partner_notified.on_overdue = true,
        }
        self.updated_at = now_epoch_ms();
        self
    }

    /// Derived overdue predicate against the supplied clock value.
    ///
    /// True iff a due date is set, lies in the past, and the task is not
    /// completed. Never stored.
    pub fn is_overdue_at(&self, now_ms: i64) -> bool {
        match self.due_date {
            Some(due) => due < now_ms && !self.completed,
            None => false,
        }
    }

    /// Derived overdue predicate against the current wall clock.
    pub fn is_overdue(&self) -> bool {
        self.is_overdue_at(now_epoch_ms())
    }

    /// Milliseconds until the due date at the supplied clock value.
    ///
    /// `None` when no due date is set or the task is already completed.
    /// Negative for overdue tasks; callers must not assume non-negativity.
    pub fn time_until_due_at(&self, now_ms: i64) -> Option<i64> {
        if self.completed {
            return None;
        }
        self.due_date.map(|due| due - now_ms)
    }

    /// Milliseconds until the due date against the current wall clock.
    pub fn time_until_due(&self) -> Option<i64> {
        self.time_until_due_at(now_epoch_ms())
    }
}

const ERR_TITLE_REQUIRED: &str = "Title is required";
const ERR_TITLE_EMPTY: &str = "Title cannot be empty";
const ERR_INVALID_STATUS: &str = "Invalid task status";
const ERR_INVALID_PRIORITY: &str = "Invalid task priority";
const ERR_INVALID_TIME_ESTIMATE: &str = "Time estimate must be a non-negative number";
const ERR_NOT_AN_OBJECT: &str = "Task data must be an object";

/// Validates untyped task input at the UI boundary.
///
/// # Contract
/// - Never panics; all findings are reported as data.
/// - An absent title and a present-but-blank title produce distinct
///   messages ("Title is required" vs "Title cannot be empty") because the
///   UI layer surfaces them verbatim.
/// - A non-object payload yields exactly one generic error.
pub fn validate_task_input(value: &Value) -> ValidationReport {
    let Some(fields) = value.as_object() else {
        return ValidationReport::single(ERR_NOT_AN_OBJECT);
    };

    let mut errors = Vec::new();

    match fields.get("title") {
        None | Some(Value::Null) => errors.push(ERR_TITLE_REQUIRED.to_string()),
        Some(Value::String(title)) if title.trim().is_empty() => {
            errors.push(ERR_TITLE_EMPTY.to_string());
        }
        Some(Value::String(_)) => {}
        Some(_) => errors.push(ERR_TITLE_REQUIRED.to_string()),
    }

    if let Some(status) = fields.get("status").filter(|v| !v.is_null()) {
        let known = status
            .as_str()
            .is_some_and(|s| matches!(s, "pending" | "in_progress" | "completed"));
        if !known {
            errors.push(ERR_INVALID_STATUS.to_string());
        }
    }

    if let Some(priority) = fields.get("priority").filter(|v| !v.is_null()) {
        let known = priority
            .as_str()
            .is_some_and(|s| matches!(s, "low" | "medium" | "high" | "urgent"));
        if !known {
            errors.push(ERR_INVALID_PRIORITY.to_string());
        }
    }

    if let Some(estimate) = fields.get("time_estimate_minutes").filter(|v| !v.is_null()) {
        let non_negative = estimate.as_i64().is_some_and(|minutes| minutes >= 0)
            || estimate.as_f64().is_some_and(|minutes| minutes >= 0.0);
        if !non_negative {
            errors.push(ERR_INVALID_TIME_ESTIMATE.to_string());
        }
    }

    ValidationReport::from_errors(errors)
}
