//! Notification domain events and delivery records.
//!
//! # Responsibility
//! - Define the domain events services emit on task/partnership activity.
//! - Define the fixed-shape record handed to platform delivery and rendered
//!   by the in-app notification list.
//!
//! # Invariants
//! - Record field layout is a stable contract; the platform layer and the
//!   in-app list both depend on it.

use crate::model::task::{TaskId, UserId};
use crate::model::user::NotificationCategory;
use crate::model::now_epoch_ms;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a persisted notification record.
pub type NotificationId = Uuid;

/// Domain event emitted by the task/partnership services.
///
/// Events carry everything dispatch needs so the notification service never
/// reaches back into task storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    TaskAssigned {
        recipient_id: UserId,
        task_id: TaskId,
        task_title: String,
        actor_name: String,
        due_date: Option<i64>,
    },
    TaskStarted {
        recipient_id: UserId,
        task_id: TaskId,
        task_title: String,
        actor_name: String,
    },
    TaskCompleted {
        recipient_id: UserId,
        task_id: TaskId,
        task_title: String,
        actor_name: String,
        xp_earned: u32,
    },
    TaskOverdue {
        recipient_id: UserId,
        task_id: TaskId,
        task_title: String,
        due_date: i64,
    },
    EncouragementSent {
        recipient_id: UserId,
        task_id: TaskId,
        task_title: String,
        actor_name: String,
        message: String,
    },
    CheckIn {
        recipient_id: UserId,
        actor_name: String,
    },
}

impl NotificationEvent {
    /// The user whose preferences gate delivery.
    pub fn recipient_id(&self) -> UserId {
        match self {
            Self::TaskAssigned { recipient_id, .. }
            | Self::TaskStarted { recipient_id, .. }
            | Self::TaskCompleted { recipient_id, .. }
            | Self::TaskOverdue { recipient_id, .. }
            | Self::EncouragementSent { recipient_id, .. }
            | Self::CheckIn { recipient_id, .. } => *recipient_id,
        }
    }

    /// Preference category this event falls under.
    pub fn category(&self) -> NotificationCategory {
        match self {
            Self::TaskAssigned { .. } => NotificationCategory::TaskAssigned,
            Self::TaskStarted { .. } => NotificationCategory::TaskStarted,
            Self::TaskCompleted { .. } => NotificationCategory::TaskCompleted,
            Self::TaskOverdue { .. } => NotificationCategory::TaskOverdue,
            Self::EncouragementSent { .. } => NotificationCategory::Encouragement,
            Self::CheckIn { .. } => NotificationCategory::CheckIn,
        }
    }
}

/// Fixed-shape record consumed by platform delivery and the in-app list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: NotificationId,
    pub category: NotificationCategory,
    pub recipient_id: UserId,
    /// Short headline shown in the platform notification.
    pub title: String,
    /// Supporting line; encouragement text or due-date phrasing.
    pub body: String,
    pub task_id: Option<TaskId>,
    pub task_title: Option<String>,
    pub actor_name: Option<String>,
    pub xp_earned: Option<u32>,
    pub created_at: i64,
}

impl NotificationRecord {
    /// Builds the delivery record for a domain event.
    pub fn from_event(event: &NotificationEvent) -> Self {
        let base = |title: String,
                    body: String,
                    task: Option<(TaskId, &str)>,
                    actor: Option<&str>,
                    xp: Option<u32>| Self {
            id: Uuid::new_v4(),
            category: event.category(),
            recipient_id: event.recipient_id(),
            title,
            body,
            task_id: task.map(|(id, _)| id),
            task_title: task.map(|(_, t)| t.to_string()),
            actor_name: actor.map(str::to_string),
            xp_earned: xp,
            created_at: now_epoch_ms(),
        };

        match event {
            NotificationEvent::TaskAssigned {
                task_id,
                task_title,
                actor_name,
                ..
            } => base(
                format!("{actor_name} assigned you a task"),
                task_title.clone(),
                Some((*task_id, task_title)),
                Some(actor_name),
                None,
            ),
            NotificationEvent::TaskStarted {
                task_id,
                task_title,
                actor_name,
                ..
            } => base(
                format!("{actor_name} started a task"),
                task_title.clone(),
                Some((*task_id, task_title)),
                Some(actor_name),
                None,
            ),
            NotificationEvent::TaskCompleted {
                task_id,
                task_title,
                actor_name,
                xp_earned,
                ..
            } => base(
                format!("{actor_name} completed a task"),
                format!("{task_title} (+{xp_earned} XP)"),
                Some((*task_id, task_title)),
                Some(actor_name),
                Some(*xp_earned),
            ),
            NotificationEvent::TaskOverdue {
                task_id, task_title, ..
            } => base(
                "Task overdue".to_string(),
                task_title.clone(),
                Some((*task_id, task_title)),
                None,
                None,
            ),
            NotificationEvent::EncouragementSent {
                task_id,
                task_title,
                actor_name,
                message,
                ..
            } => base(
                format!("{actor_name} sent encouragement"),
                message.clone(),
                Some((*task_id, task_title)),
                Some(actor_name),
                None,
            ),
            NotificationEvent::CheckIn { actor_name, .. } => base(
                format!("{actor_name} checked in"),
                "How is your day going?".to_string(),
                None,
                Some(actor_name),
                None,
            ),
        }
    }
}
