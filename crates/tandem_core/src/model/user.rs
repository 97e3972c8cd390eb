//! User domain model.
//!
//! # Responsibility
//! - Define the user record, role, gamification stats, and notification
//!   preferences.
//! - Provide pure update helpers mirroring the task/partnership transition
//!   style.
//!
//! # Invariants
//! - Security fields (password hash/salt, session token) are stored
//!   opaquely; nothing in core interprets them.
//! - `partner_id` is a denormalized mirror of the active partnership and is
//!   kept in sync by the partnership service, not by this module.

use crate::model::task::UserId;
use crate::model::{now_epoch_ms, ValidationReport};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How this account participates in partnerships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// The task owner receiving assistance.
    #[default]
    AdhdUser,
    /// An accountability partner.
    Partner,
    /// Acts in both capacities.
    Both,
}

/// Notification categories a user can opt out of individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    TaskAssigned,
    TaskStarted,
    TaskCompleted,
    TaskOverdue,
    Encouragement,
    CheckIn,
}

impl NotificationCategory {
    /// Categories that still get through under `ImportantOnly`.
    ///
    /// New assignments and overdue reminders are actionable; the rest are
    /// ambient progress chatter.
    pub fn is_important(self) -> bool {
        matches!(self, Self::TaskAssigned | Self::TaskOverdue)
    }
}

/// Global override applied on top of per-category preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlobalNotificationLevel {
    #[default]
    All,
    ImportantOnly,
    None,
}

/// Per-user notification delivery preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    pub task_assigned: bool,
    pub task_started: bool,
    pub task_completed: bool,
    pub task_overdue: bool,
    pub encouragement: bool,
    pub check_in: bool,
    pub global: GlobalNotificationLevel,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            task_assigned: true,
            task_started: true,
            task_completed: true,
            task_overdue: true,
            encouragement: true,
            check_in: true,
            global: GlobalNotificationLevel::All,
        }
    }
}

impl NotificationPreferences {
    fn category_enabled(&self, category: NotificationCategory) -> bool {
        match category {
            NotificationCategory::TaskAssigned => self.task_assigned,
            NotificationCategory::TaskStarted => self.task_started,
            NotificationCategory::TaskCompleted => self.task_completed,
            NotificationCategory::TaskOverdue => self.task_overdue,
            NotificationCategory::Encouragement => self.encouragement,
            NotificationCategory::CheckIn => self.check_in,
        }
    }

    /// Whether a notification in `category` may be delivered to this user.
    ///
    /// The global override narrows, never widens: `None` blocks everything,
    /// `ImportantOnly` additionally requires the category to be important.
    pub fn allows(&self, category: NotificationCategory) -> bool {
        match self.global {
            GlobalNotificationLevel::None => false,
            GlobalNotificationLevel::ImportantOnly => {
                category.is_important() && self.category_enabled(category)
            }
            GlobalNotificationLevel::All => self.category_enabled(category),
        }
    }
}

/// Partial update for `NotificationPreferences`; `None` fields are left
/// as-is.
#[derive(Debug, Clone, Default)]
pub struct PreferencesPatch {
    pub task_assigned: Option<bool>,
    pub task_started: Option<bool>,
    pub task_completed: Option<bool>,
    pub task_overdue: Option<bool>,
    pub encouragement: Option<bool>,
    pub check_in: Option<bool>,
    pub global: Option<GlobalNotificationLevel>,
}

/// Gamification counters shown on the user's profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserStats {
    pub tasks_assigned: u32,
    pub tasks_completed: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_xp: u64,
}

/// Partial update for `UserStats`; `None` fields are left as-is.
#[derive(Debug, Clone, Default)]
pub struct UserStatsPatch {
    pub tasks_assigned: Option<u32>,
    pub tasks_completed: Option<u32>,
    pub current_streak: Option<u32>,
    pub longest_streak: Option<u32>,
    pub total_xp: Option<u64>,
}

/// Creation input for `User::create`.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub role: UserRole,
}

/// Canonical user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    /// Opaque to core; owned by the auth layer.
    pub password_hash: Option<String>,
    pub password_salt: Option<String>,
    pub session_token: Option<String>,
    pub last_login_at: Option<i64>,
    /// Denormalized pointer to the current partner. Mirrors the active
    /// partnership record; the partnership service updates both.
    pub partner_id: Option<UserId>,
    pub preferences: NotificationPreferences,
    pub stats: UserStats,
    /// Messages the user offers partners as one-tap encouragements.
    pub custom_encouragement_messages: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub last_active_at: i64,
}

impl User {
    /// Creates a user with defaults filled in.
    pub fn create(input: NewUser) -> Self {
        let now = now_epoch_ms();
        Self {
            id: Uuid::new_v4(),
            email: input.email,
            name: input.name,
            role: input.role,
            password_hash: None,
            password_salt: None,
            session_token: None,
            last_login_at: None,
            partner_id: None,
            preferences: NotificationPreferences::default(),
            stats: UserStats::default(),
            custom_encouragement_messages: Vec::new(),
            created_at: now,
            updated_at: now,
            last_active_at: now,
        }
    }

    /// Validates the typed record before persistence.
    pub fn validate(&self) -> ValidationReport {
        let mut errors = Vec::new();
        if !self.email.contains('@') {
            errors.push("Email must contain @".to_string());
        }
        if self.name.trim().is_empty() {
            errors.push("Name cannot be empty".to_string());
        }
        ValidationReport::from_errors(errors)
    }

    /// Shallow-merges a stats patch, keeping `longest_streak` at least as
    /// large as `current_streak`.
    pub fn update_stats(mut self, patch: UserStatsPatch) -> Self {
        if let Some(value) = patch.tasks_assigned {
            self.stats.tasks_assigned = value;
        }
        if let Some(value) = patch.tasks_completed {
            self.stats.tasks_completed = value;
        }
        if let Some(value) = patch.current_streak {
            self.stats.current_streak = value;
        }
        if let Some(value) = patch.longest_streak {
            self.stats.longest_streak = value;
        }
        if let Some(value) = patch.total_xp {
            self.stats.total_xp = value;
        }
        self.stats.longest_streak = self.stats.longest_streak.max(self.stats.current_streak);
        self.updated_at = now_epoch_ms();
        self
    }

    /// Points `partner_id` at the given user (or clears it).
    pub fn set_partner(mut self, partner_id: Option<UserId>) -> Self {
        self.partner_id = partner_id;
        self.updated_at = now_epoch_ms();
        self
    }

    /// Shallow-merges a notification-preferences patch.
    pub fn update_notification_preferences(mut self, patch: PreferencesPatch) -> Self {
        if let Some(value) = patch.task_assigned {
            self.preferences.task_assigned = value;
        }
        if let Some(value) = patch.task_started {
            self.preferences.task_started = value;
        }
        if let Some(value) = patch.task_completed {
            self.preferences.task_completed = value;
        }
        if let Some(value) = patch.task_overdue {
            self.preferences.task_overdue = value;
        }
        if let Some(value) = patch.encouragement {
            self.preferences.encouragement = value;
        }
        if let Some(value) = patch.check_in {
            self.preferences.check_in = value;
        }
        if let Some(value) = patch.global {
            self.preferences.global = value;
        }
        self.updated_at = now_epoch_ms();
        self
    }

    /// Appends one custom encouragement message. Append-only.
    pub fn add_custom_encouragement_message(mut self, message: impl Into<String>) -> Self {
        self.custom_encouragement_messages.push(message.into());
        self.updated_at = now_epoch_ms();
        self
    }

    /// Bumps the activity timestamp.
    pub fn touch_activity(mut self) -> Self {
        let now = now_epoch_ms();
        self.last_active_at = now;
        self.updated_at = now;
        self
    }
}

/// Validates untyped user input at the UI boundary.
///
/// Mirrors `validate_task_input`: plain-language findings, never panics,
/// non-object payloads yield one generic error.
pub fn validate_user_input(value: &serde_json::Value) -> ValidationReport {
    let Some(fields) = value.as_object() else {
        return ValidationReport::single("User data must be an object");
    };

    let mut errors = Vec::new();

    match fields.get("email").and_then(|v| v.as_str()) {
        None => errors.push("Email is required".to_string()),
        Some(email) if !email.contains('@') => errors.push("Email must contain @".to_string()),
        Some(_) => {}
    }

    match fields.get("name").and_then(|v| v.as_str()) {
        None => errors.push("Name is required".to_string()),
        Some(name) if name.trim().is_empty() => errors.push("Name cannot be empty".to_string()),
        Some(_) => {}
    }

    if let Some(role) = fields.get("role").filter(|v| !v.is_null()) {
        let known = role
            .as_str()
            .is_some_and(|s| matches!(s, "adhd_user" | "partner" | "both"));
        if !known {
            errors.push("Invalid user role".to_string());
        }
    }

    ValidationReport::from_errors(errors)
}
