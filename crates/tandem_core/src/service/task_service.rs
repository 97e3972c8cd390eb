//! Task use-case service.
//!
//! # Responsibility
//! - Orchestrate task lifecycle operations (create, start, complete,
//!   assign, encourage, overdue sweep) over repositories.
//! - Enforce partnership permissions before partner-initiated mutations.
//! - Emit notification events after the domain mutation is persisted.
//!
//! # Invariants
//! - The primary mutation is written before any side effect; notification
//!   dispatch can never fail it.
//! - Partner-notification flags are set at most once per kind per task.

use crate::model::notification::NotificationEvent;
use crate::model::partnership::{Partnership, PartnershipStatus, StatsPatch};
use crate::model::task::{
    NewTask, PartnerNotifyKind, Task, TaskId, UserId, DEFAULT_COMPLETION_XP,
};
use crate::model::user::UserStatsPatch;
use crate::model::ValidationReport;
use crate::repo::partnership_repo::PartnershipRepository;
use crate::repo::task_repo::TaskRepository;
use crate::repo::user_repo::UserRepository;
use crate::repo::RepoError;
use crate::service::notification_service::NotificationSink;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type TaskServiceResult<T> = Result<T, TaskServiceError>;

/// Service error for task use-cases.
#[derive(Debug)]
pub enum TaskServiceError {
    /// Input failed validation; findings are UI-ready strings.
    Validation(ValidationReport),
    TaskNotFound(TaskId),
    /// No partnership links the two users involved in the operation.
    PartnershipNotFound { a: UserId, b: UserId },
    /// The partnership exists but forbids the operation.
    NotPermitted(&'static str),
    /// The task's current state does not admit the operation.
    AlreadyCompleted(TaskId),
    Repo(RepoError),
}

impl Display for TaskServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(report) => {
                write!(f, "validation failed: {}", report.errors.join("; "))
            }
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
            Self::PartnershipNotFound { a, b } => {
                write!(f, "no partnership between {a} and {b}")
            }
            Self::NotPermitted(what) => write!(f, "not permitted: {what}"),
            Self::AlreadyCompleted(id) => write!(f, "task already completed: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TaskServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for TaskServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(report) => Self::Validation(report),
            other => Self::Repo(other),
        }
    }
}

/// Task service facade over repositories and dispatch.
pub struct TaskService<T, U, P, N>
where
    T: TaskRepository,
    U: UserRepository,
    P: PartnershipRepository,
    N: NotificationSink,
{
    tasks: T,
    users: U,
    partnerships: P,
    notifier: N,
}

impl<T, U, P, N> TaskService<T, U, P, N>
where
    T: TaskRepository,
    U: UserRepository,
    P: PartnershipRepository,
    N: NotificationSink,
{
    pub fn new(tasks: T, users: U, partnerships: P, notifier: N) -> Self {
        Self {
            tasks,
            users,
            partnerships,
            notifier,
        }
    }

    /// Creates and persists a task with defaults filled in.
    pub fn create_task(&self, input: NewTask) -> TaskServiceResult<Task> {
        let task = Task::create(input);
        self.tasks.save(&task)?;
        Ok(task)
    }

    /// Marks a task started; notifies the assigning partner once.
    pub fn start_task(&self, id: TaskId) -> TaskServiceResult<Task> {
        let task = self.require_task(id)?;
        if task.completed {
            return Err(TaskServiceError::AlreadyCompleted(id));
        }

        let mut task = task.start();
        self.tasks.update(&task)?;

        if let Some(partner_id) = task.assigned_by {
            if !task.partner_notified.on_start {
                let outcome = self.notifier.notify(NotificationEvent::TaskStarted {
                    recipient_id: partner_id,
                    task_id: task.id,
                    task_title: task.title.clone(),
                    actor_name: self.display_name(task.user_id),
                });
                if outcome.is_settled() {
                    task = task.mark_partner_notified(PartnerNotifyKind::OnStart);
                    self.tasks.update(&task)?;
                }
            }
        }

        Ok(task)
    }

    /// Completes a task, awards XP, rolls up owner and partnership stats,
    /// and notifies the assigning partner once.
    pub fn complete_task(&self, id: TaskId, xp: Option<u32>) -> TaskServiceResult<Task> {
        let task = self.require_task(id)?;
        if task.completed {
            return Err(TaskServiceError::AlreadyCompleted(id));
        }

        let xp = xp.unwrap_or(DEFAULT_COMPLETION_XP);
        let mut task = task.complete(xp);
        self.tasks.update(&task)?;
        info!(
            "event=task_completed module=task status=ok task={} xp={xp}",
            task.id
        );

        self.roll_up_owner_stats(&task, xp);

        if let Some(partner_id) = task.assigned_by {
            if let Some(partnership) = self.partnership_between(task.user_id, partner_id)? {
                let completed = partnership.stats.tasks_completed + 1;
                let partnership = partnership.update_stats(StatsPatch {
                    tasks_completed: Some(completed),
                    ..StatsPatch::default()
                });
                if let Err(err) = self.partnerships.update(&partnership) {
                    warn!(
                        "event=partnership_stats module=task status=error partnership={} error={err}",
                        partnership.id
                    );
                }
            }

            if !task.partner_notified.on_complete {
                let outcome = self.notifier.notify(NotificationEvent::TaskCompleted {
                    recipient_id: partner_id,
                    task_id: task.id,
                    task_title: task.title.clone(),
                    actor_name: self.display_name(task.user_id),
                    xp_earned: xp,
                });
                if outcome.is_settled() {
                    task = task.mark_partner_notified(PartnerNotifyKind::OnComplete);
                    self.tasks.update(&task)?;
                }
            }
        }

        Ok(task)
    }

    /// Assigns an existing task from one partner to another.
    ///
    /// `assigned_to` must be the task's owner. Requires an active
    /// partnership between the two users with task assignment enabled.
    pub fn assign_task(
        &self,
        task_id: TaskId,
        assigned_by: UserId,
        assigned_to: UserId,
        due_date: Option<i64>,
        preferred_start_time: Option<i64>,
    ) -> TaskServiceResult<Task> {
        let task = self.require_task(task_id)?;
        if task.user_id != assigned_to {
            return Err(TaskServiceError::NotPermitted(
                "tasks can only be assigned to their owner",
            ));
        }

        let partnership = self
            .partnership_between(assigned_by, assigned_to)?
            .ok_or(TaskServiceError::PartnershipNotFound {
                a: assigned_by,
                b: assigned_to,
            })?;
        if partnership.status != PartnershipStatus::Active {
            return Err(TaskServiceError::NotPermitted("partnership is not active"));
        }
        if !partnership.settings.can_assign_tasks {
            return Err(TaskServiceError::NotPermitted(
                "task assignment is disabled for this partnership",
            ));
        }

        let task = task.assign(assigned_by, assigned_to, due_date, preferred_start_time);
        self.tasks.update(&task)?;

        let assigned = partnership.stats.tasks_assigned + 1;
        let partnership = partnership.update_stats(StatsPatch {
            tasks_assigned: Some(assigned),
            ..StatsPatch::default()
        });
        if let Err(err) = self.partnerships.update(&partnership) {
            warn!(
                "event=partnership_stats module=task status=error partnership={} error={err}",
                partnership.id
            );
        }

        if let Ok(Some(assigner)) = self.users.get_by_id(assigned_by) {
            let assigned_total = assigner.stats.tasks_assigned + 1;
            let assigner = assigner.update_stats(UserStatsPatch {
                tasks_assigned: Some(assigned_total),
                ..UserStatsPatch::default()
            });
            if let Err(err) = self.users.update(&assigner) {
                warn!(
                    "event=user_stats module=task status=error user={assigned_by} error={err}"
                );
            }
        }

        self.notifier.notify(NotificationEvent::TaskAssigned {
            recipient_id: assigned_to,
            task_id: task.id,
            task_title: task.title.clone(),
            actor_name: self.display_name(assigned_by),
            due_date,
        });

        Ok(task)
    }

    /// Attaches an encouragement message to a task and notifies its owner.
    pub fn send_encouragement(
        &self,
        task_id: TaskId,
        from_user_id: UserId,
        message: &str,
    ) -> TaskServiceResult<Task> {
        let task = self.require_task(task_id)?;

        let partnership = self
            .partnership_between(from_user_id, task.user_id)?
            .ok_or(TaskServiceError::PartnershipNotFound {
                a: from_user_id,
                b: task.user_id,
            })?;
        if partnership.status != PartnershipStatus::Active {
            return Err(TaskServiceError::NotPermitted("partnership is not active"));
        }
        if !partnership.settings.can_send_encouragement {
            return Err(TaskServiceError::NotPermitted(
                "encouragement is disabled for this partnership",
            ));
        }

        let task = task.add_encouragement(message, from_user_id);
        self.tasks.update(&task)?;

        let sent = partnership.stats.encouragements_sent + 1;
        let partnership = partnership.update_stats(StatsPatch {
            encouragements_sent: Some(sent),
            ..StatsPatch::default()
        });
        if let Err(err) = self.partnerships.update(&partnership) {
            warn!(
                "event=partnership_stats module=task status=error partnership={} error={err}",
                partnership.id
            );
        }

        self.notifier.notify(NotificationEvent::EncouragementSent {
            recipient_id: task.user_id,
            task_id: task.id,
            task_title: task.title.clone(),
            actor_name: self.display_name(from_user_id),
            message: message.to_string(),
        });

        Ok(task)
    }

    /// Notifies assigning partners about newly overdue tasks for one owner.
    ///
    /// Each task fires at most once; the `on_overdue` flag dedupes repeat
    /// sweeps. Returns how many notifications were dispatched.
    pub fn sweep_overdue(&self, user_id: UserId, now_ms: i64) -> TaskServiceResult<u32> {
        let mut notified = 0;
        for task in self.tasks.get_all_for_user(user_id)? {
            if !task.is_overdue_at(now_ms) || task.partner_notified.on_overdue {
                continue;
            }
            let Some(partner_id) = task.assigned_by else {
                continue;
            };
            let Some(due_date) = task.due_date else {
                continue;
            };

            let outcome = self.notifier.notify(NotificationEvent::TaskOverdue {
                recipient_id: partner_id,
                task_id: task.id,
                task_title: task.title.clone(),
                due_date,
            });
            if outcome.is_settled() {
                let task = task.mark_partner_notified(PartnerNotifyKind::OnOverdue);
                self.tasks.update(&task)?;
                notified += 1;
            }
        }
        Ok(notified)
    }

    /// Looks up one task by id.
    pub fn get_task(&self, id: TaskId) -> TaskServiceResult<Option<Task>> {
        Ok(self.tasks.get_by_id(id)?)
    }

    /// All tasks owned by `user_id`.
    pub fn list_tasks_for_user(&self, user_id: UserId) -> TaskServiceResult<Vec<Task>> {
        Ok(self.tasks.get_all_for_user(user_id)?)
    }

    /// Removes a task record. Idempotent.
    pub fn delete_task(&self, id: TaskId) -> TaskServiceResult<()> {
        Ok(self.tasks.delete(id)?)
    }

    fn require_task(&self, id: TaskId) -> TaskServiceResult<Task> {
        self.tasks
            .get_by_id(id)?
            .ok_or(TaskServiceError::TaskNotFound(id))
    }

    /// Most recent non-terminated partnership linking the two users.
    fn partnership_between(
        &self,
        a: UserId,
        b: UserId,
    ) -> TaskServiceResult<Option<Partnership>> {
        let partnerships = self.partnerships.get_all_for_user(a)?;
        Ok(partnerships.into_iter().find(|partnership| {
            partnership.involves(b)
                && !matches!(
                    partnership.status,
                    PartnershipStatus::Terminated | PartnershipStatus::Declined
                )
        }))
    }

    fn display_name(&self, user_id: UserId) -> String {
        match self.users.get_by_id(user_id) {
            Ok(Some(user)) => user.name,
            _ => "Your partner".to_string(),
        }
    }

    /// Completion roll-up on the owner: counters, XP, streak clamp.
    fn roll_up_owner_stats(&self, task: &Task, xp: u32) {
        match self.users.get_by_id(task.user_id) {
            Ok(Some(owner)) => {
                let stats = owner.stats;
                let owner = owner.update_stats(UserStatsPatch {
                    tasks_completed: Some(stats.tasks_completed + 1),
                    total_xp: Some(stats.total_xp + u64::from(xp)),
                    current_streak: Some(stats.current_streak + 1),
                    ..UserStatsPatch::default()
                });
                if let Err(err) = self.users.update(&owner) {
                    warn!(
                        "event=user_stats module=task status=error user={} error={err}",
                        task.user_id
                    );
                }
            }
            Ok(None) => warn!(
                "event=user_stats module=task status=error reason=owner_missing user={}",
                task.user_id
            ),
            Err(err) => warn!(
                "event=user_stats module=task status=error user={} error={err}",
                task.user_id
            ),
        }
    }
}
