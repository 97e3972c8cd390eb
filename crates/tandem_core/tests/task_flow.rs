use std::cell::RefCell;
use std::rc::Rc;
use tandem_core::db::open_db_in_memory;
use tandem_core::model::now_epoch_ms;
use tandem_core::{
    DispatchOutcome, NewTask, NewUser, NotificationEvent, NotificationSink, PartnershipRepository,
    PartnershipService, SettingsPatch, SqlitePartnershipRepository, SqliteTaskRepository,
    SqliteUserRepository, TaskService, TaskServiceError, User, UserRepository, UserRole,
    DEFAULT_COMPLETION_XP,
};
use uuid::Uuid;

#[derive(Clone, Default)]
struct RecordingSink {
    events: Rc<RefCell<Vec<NotificationEvent>>>,
}

impl NotificationSink for RecordingSink {
    fn notify(&self, event: NotificationEvent) -> DispatchOutcome {
        self.events.borrow_mut().push(event);
        DispatchOutcome::Delivered
    }
}

type TestTaskService<'conn> = TaskService<
    SqliteTaskRepository<'conn>,
    SqliteUserRepository<'conn>,
    SqlitePartnershipRepository<'conn>,
    RecordingSink,
>;

fn task_service<'conn>(conn: &'conn rusqlite::Connection, sink: RecordingSink) -> TestTaskService<'conn> {
    TaskService::new(
        SqliteTaskRepository::new(conn),
        SqliteUserRepository::new(conn),
        SqlitePartnershipRepository::new(conn),
        sink,
    )
}

fn register_user(conn: &rusqlite::Connection, name: &str, role: UserRole) -> User {
    let user = User::create(NewUser {
        email: format!("{}@example.com", name.to_ascii_lowercase()),
        name: name.to_string(),
        role,
    });
    SqliteUserRepository::new(conn).save(&user).unwrap();
    user
}

/// Active partnership between the two users, permissive settings.
fn link_partners(conn: &rusqlite::Connection, adhd_user: &User, partner: &User) -> Uuid {
    let svc = PartnershipService::new(
        SqlitePartnershipRepository::new(conn),
        SqliteUserRepository::new(conn),
        RecordingSink::default(),
    );
    let invite = svc.create_invite(adhd_user.id).unwrap();
    svc.accept_invite(&invite.invite_code, partner.id).unwrap();
    invite.id
}

#[test]
fn create_then_fetch_returns_saved_task() {
    let conn = open_db_in_memory().unwrap();
    let svc = task_service(&conn, RecordingSink::default());
    let owner = register_user(&conn, "Sam", UserRole::AdhdUser);

    let task = svc
        .create_task(NewTask {
            user_id: owner.id,
            title: "Buy milk".to_string(),
            ..NewTask::default()
        })
        .unwrap();

    let loaded = svc.get_task(task.id).unwrap().unwrap();
    assert_eq!(loaded, task);
    assert_eq!(svc.list_tasks_for_user(owner.id).unwrap().len(), 1);
}

#[test]
fn assign_requires_active_permissive_partnership() {
    let conn = open_db_in_memory().unwrap();
    let sink = RecordingSink::default();
    let svc = task_service(&conn, sink.clone());
    let owner = register_user(&conn, "Sam", UserRole::AdhdUser);
    let partner = register_user(&conn, "Pat", UserRole::Partner);
    let stranger = register_user(&conn, "Kim", UserRole::Partner);

    let task = svc
        .create_task(NewTask {
            user_id: owner.id,
            title: "Do the dishes".to_string(),
            ..NewTask::default()
        })
        .unwrap();

    // No partnership at all.
    let err = svc
        .assign_task(task.id, stranger.id, owner.id, None, None)
        .unwrap_err();
    assert!(matches!(err, TaskServiceError::PartnershipNotFound { .. }));

    let partnership_id = link_partners(&conn, &owner, &partner);
    let due = now_epoch_ms() + 3_600_000;
    let assigned = svc
        .assign_task(task.id, partner.id, owner.id, Some(due), None)
        .unwrap();

    assert_eq!(assigned.assigned_by, Some(partner.id));
    assert_eq!(assigned.assigned_to, Some(owner.id));
    assert_eq!(assigned.due_date, Some(due));

    // Partnership and assigner stats were bumped.
    let partnerships = SqlitePartnershipRepository::new(&conn);
    let partnership = partnerships.get_by_id(partnership_id).unwrap().unwrap();
    assert_eq!(partnership.stats.tasks_assigned, 1);
    let users = SqliteUserRepository::new(&conn);
    let assigner = users.get_by_id(partner.id).unwrap().unwrap();
    assert_eq!(assigner.stats.tasks_assigned, 1);

    // Assignee was notified.
    let events = sink.events.borrow();
    assert!(events.iter().any(|event| matches!(
        event,
        NotificationEvent::TaskAssigned { recipient_id, .. } if *recipient_id == owner.id
    )));
}

#[test]
fn assign_requires_assignee_to_own_the_task() {
    let conn = open_db_in_memory().unwrap();
    let svc = task_service(&conn, RecordingSink::default());
    let owner = register_user(&conn, "Sam", UserRole::AdhdUser);
    let partner = register_user(&conn, "Pat", UserRole::Partner);
    let third = register_user(&conn, "Kim", UserRole::AdhdUser);
    link_partners(&conn, &owner, &partner);

    // A task owned by a third user cannot be routed between the partners.
    let task = svc
        .create_task(NewTask {
            user_id: third.id,
            title: "someone else's chore".to_string(),
            ..NewTask::default()
        })
        .unwrap();
    let err = svc
        .assign_task(task.id, partner.id, owner.id, None, None)
        .unwrap_err();
    assert!(matches!(err, TaskServiceError::NotPermitted(_)));

    let untouched = svc.get_task(task.id).unwrap().unwrap();
    assert_eq!(untouched.assigned_by, None);
    assert_eq!(untouched.assigned_to, None);
}

#[test]
fn assign_respects_settings_toggle() {
    let conn = open_db_in_memory().unwrap();
    let svc = task_service(&conn, RecordingSink::default());
    let owner = register_user(&conn, "Sam", UserRole::AdhdUser);
    let partner = register_user(&conn, "Pat", UserRole::Partner);
    let partnership_id = link_partners(&conn, &owner, &partner);

    let partnership_svc = PartnershipService::new(
        SqlitePartnershipRepository::new(&conn),
        SqliteUserRepository::new(&conn),
        RecordingSink::default(),
    );
    partnership_svc
        .update_settings(
            partnership_id,
            SettingsPatch {
                can_assign_tasks: Some(false),
                ..SettingsPatch::default()
            },
        )
        .unwrap();

    let task = svc
        .create_task(NewTask {
            user_id: owner.id,
            title: "blocked".to_string(),
            ..NewTask::default()
        })
        .unwrap();
    let err = svc
        .assign_task(task.id, partner.id, owner.id, None, None)
        .unwrap_err();
    assert!(matches!(err, TaskServiceError::NotPermitted(_)));
}

#[test]
fn start_notifies_assigning_partner_once() {
    let conn = open_db_in_memory().unwrap();
    let sink = RecordingSink::default();
    let svc = task_service(&conn, sink.clone());
    let owner = register_user(&conn, "Sam", UserRole::AdhdUser);
    let partner = register_user(&conn, "Pat", UserRole::Partner);
    link_partners(&conn, &owner, &partner);

    let task = svc
        .create_task(NewTask {
            user_id: owner.id,
            title: "morning pages".to_string(),
            ..NewTask::default()
        })
        .unwrap();
    let task = svc
        .assign_task(task.id, partner.id, owner.id, None, None)
        .unwrap();

    let started = svc.start_task(task.id).unwrap();
    assert!(started.partner_notified.on_start);
    assert!(!started.partner_notified.on_complete);

    let start_events = sink
        .events
        .borrow()
        .iter()
        .filter(|event| matches!(event, NotificationEvent::TaskStarted { .. }))
        .count();
    assert_eq!(start_events, 1);

    // Restarting does not re-notify.
    svc.start_task(task.id).unwrap();
    let start_events = sink
        .events
        .borrow()
        .iter()
        .filter(|event| matches!(event, NotificationEvent::TaskStarted { .. }))
        .count();
    assert_eq!(start_events, 1);
}

#[test]
fn complete_rolls_up_stats_and_notifies() {
    let conn = open_db_in_memory().unwrap();
    let sink = RecordingSink::default();
    let svc = task_service(&conn, sink.clone());
    let owner = register_user(&conn, "Sam", UserRole::AdhdUser);
    let partner = register_user(&conn, "Pat", UserRole::Partner);
    let partnership_id = link_partners(&conn, &owner, &partner);

    let task = svc
        .create_task(NewTask {
            user_id: owner.id,
            title: "ship it".to_string(),
            ..NewTask::default()
        })
        .unwrap();
    let task = svc
        .assign_task(task.id, partner.id, owner.id, None, None)
        .unwrap();

    let completed = svc.complete_task(task.id, Some(40)).unwrap();
    assert!(completed.completed);
    assert_eq!(completed.xp_earned, 40);
    assert!(completed.partner_notified.on_complete);

    let users = SqliteUserRepository::new(&conn);
    let owner = users.get_by_id(owner.id).unwrap().unwrap();
    assert_eq!(owner.stats.tasks_completed, 1);
    assert_eq!(owner.stats.total_xp, 40);
    assert_eq!(owner.stats.current_streak, 1);
    assert_eq!(owner.stats.longest_streak, 1);

    let partnerships = SqlitePartnershipRepository::new(&conn);
    let partnership = partnerships.get_by_id(partnership_id).unwrap().unwrap();
    assert_eq!(partnership.stats.tasks_completed, 1);

    let events = sink.events.borrow();
    assert!(events.iter().any(|event| matches!(
        event,
        NotificationEvent::TaskCompleted { xp_earned: 40, .. }
    )));
}

#[test]
fn complete_defaults_xp_and_rejects_double_completion() {
    let conn = open_db_in_memory().unwrap();
    let svc = task_service(&conn, RecordingSink::default());
    let owner = register_user(&conn, "Sam", UserRole::AdhdUser);

    let task = svc
        .create_task(NewTask {
            user_id: owner.id,
            title: "once only".to_string(),
            ..NewTask::default()
        })
        .unwrap();

    let completed = svc.complete_task(task.id, None).unwrap();
    assert_eq!(completed.xp_earned, DEFAULT_COMPLETION_XP);

    let err = svc.complete_task(task.id, None).unwrap_err();
    assert!(matches!(err, TaskServiceError::AlreadyCompleted(_)));
    let err = svc.start_task(task.id).unwrap_err();
    assert!(matches!(err, TaskServiceError::AlreadyCompleted(_)));
}

#[test]
fn encouragement_appends_bumps_and_notifies_owner() {
    let conn = open_db_in_memory().unwrap();
    let sink = RecordingSink::default();
    let svc = task_service(&conn, sink.clone());
    let owner = register_user(&conn, "Sam", UserRole::AdhdUser);
    let partner = register_user(&conn, "Pat", UserRole::Partner);
    let partnership_id = link_partners(&conn, &owner, &partner);

    let task = svc
        .create_task(NewTask {
            user_id: owner.id,
            title: "essay".to_string(),
            ..NewTask::default()
        })
        .unwrap();

    let task = svc
        .send_encouragement(task.id, partner.id, "you got this")
        .unwrap();
    let task = svc
        .send_encouragement(task.id, partner.id, "halfway there")
        .unwrap();

    assert_eq!(task.encouragement_received.len(), 2);
    assert_eq!(task.encouragement_received[0].message, "you got this");

    let partnerships = SqlitePartnershipRepository::new(&conn);
    let partnership = partnerships.get_by_id(partnership_id).unwrap().unwrap();
    assert_eq!(partnership.stats.encouragements_sent, 2);

    let events = sink.events.borrow();
    assert!(events.iter().any(|event| matches!(
        event,
        NotificationEvent::EncouragementSent { recipient_id, message, .. }
            if *recipient_id == owner.id && message == "you got this"
    )));
}

#[test]
fn encouragement_requires_partnership_permission() {
    let conn = open_db_in_memory().unwrap();
    let svc = task_service(&conn, RecordingSink::default());
    let owner = register_user(&conn, "Sam", UserRole::AdhdUser);
    let stranger = register_user(&conn, "Kim", UserRole::Partner);

    let task = svc
        .create_task(NewTask {
            user_id: owner.id,
            title: "private".to_string(),
            ..NewTask::default()
        })
        .unwrap();

    let err = svc
        .send_encouragement(task.id, stranger.id, "hi")
        .unwrap_err();
    assert!(matches!(err, TaskServiceError::PartnershipNotFound { .. }));
}

#[test]
fn overdue_sweep_notifies_each_task_once() {
    let conn = open_db_in_memory().unwrap();
    let sink = RecordingSink::default();
    let svc = task_service(&conn, sink.clone());
    let owner = register_user(&conn, "Sam", UserRole::AdhdUser);
    let partner = register_user(&conn, "Pat", UserRole::Partner);
    link_partners(&conn, &owner, &partner);

    let now = now_epoch_ms();
    let yesterday = now - 24 * 60 * 60 * 1000;

    let task = svc
        .create_task(NewTask {
            user_id: owner.id,
            title: "late".to_string(),
            ..NewTask::default()
        })
        .unwrap();
    svc.assign_task(task.id, partner.id, owner.id, Some(yesterday), None)
        .unwrap();

    // A self-created overdue task has no partner to notify.
    svc.create_task(NewTask {
        user_id: owner.id,
        title: "also late, but private".to_string(),
        due_date: Some(yesterday),
        ..NewTask::default()
    })
    .unwrap();

    assert_eq!(svc.sweep_overdue(owner.id, now).unwrap(), 1);
    let overdue_events = sink
        .events
        .borrow()
        .iter()
        .filter(|event| matches!(event, NotificationEvent::TaskOverdue { .. }))
        .count();
    assert_eq!(overdue_events, 1);

    // Second sweep is a no-op thanks to the on_overdue flag.
    assert_eq!(svc.sweep_overdue(owner.id, now).unwrap(), 0);

    let swept = svc.get_task(task.id).unwrap().unwrap();
    assert!(swept.partner_notified.on_overdue);
}

#[test]
fn missing_task_is_reported_as_such() {
    let conn = open_db_in_memory().unwrap();
    let svc = task_service(&conn, RecordingSink::default());

    let err = svc.start_task(Uuid::new_v4()).unwrap_err();
    assert!(matches!(err, TaskServiceError::TaskNotFound(_)));
    assert!(svc.get_task(Uuid::new_v4()).unwrap().is_none());

    // Deleting a missing task is not an error.
    svc.delete_task(Uuid::new_v4()).unwrap();
}
