//! Core domain logic for Tandem, an ADHD-focused to-do app with
//! accountability partnerships.
//! This crate is the single source of truth for business invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::notification::{NotificationEvent, NotificationRecord};
pub use model::partnership::{
    generate_invite_code, is_valid_invite_code, NewPartnership, Partnership, PartnershipId,
    PartnershipSettings, PartnershipStats, PartnershipStatus, SettingsPatch, StatsPatch,
};
pub use model::task::{
    validate_task_input, NewTask, PartnerNotified, PartnerNotifyKind, Task, TaskId, TaskPriority,
    TaskStatus, UserId, DEFAULT_COMPLETION_XP,
};
pub use model::user::{
    validate_user_input, GlobalNotificationLevel, NewUser, NotificationCategory,
    NotificationPreferences, PreferencesPatch, User, UserRole, UserStats, UserStatsPatch,
};
pub use model::ValidationReport;
pub use repo::notification_repo::{NotificationRepository, SqliteNotificationRepository};
pub use repo::partnership_repo::{PartnershipRepository, SqlitePartnershipRepository};
pub use repo::task_repo::{SqliteTaskRepository, TaskRepository};
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use repo::{RepoError, RepoResult};
pub use service::notification_service::{
    DeliveryError, DispatchOutcome, LogOnlyDelivery, NotificationDelivery, NotificationService,
    NotificationSink,
};
pub use service::partnership_service::{
    transition_allowed, PartnershipAction, PartnershipService, PartnershipServiceError,
};
pub use service::task_service::{TaskService, TaskServiceError};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
