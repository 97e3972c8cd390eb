use serde_json::json;
use tandem_core::model::now_epoch_ms;
use tandem_core::{
    validate_task_input, NewTask, PartnerNotifyKind, Task, TaskPriority, TaskStatus,
    DEFAULT_COMPLETION_XP,
};
use uuid::Uuid;

fn quick_task(title: &str) -> Task {
    Task::create(NewTask {
        user_id: Uuid::new_v4(),
        title: title.to_string(),
        ..NewTask::default()
    })
}

#[test]
fn create_sets_defaults() {
    let task = quick_task("Buy milk");

    assert!(!task.id.is_nil());
    assert_eq!(task.status, TaskStatus::Pending);
    assert!(!task.completed);
    assert_eq!(task.completed_at, None);
    assert_eq!(task.started_at, None);
    assert_eq!(task.priority, TaskPriority::Medium);
    assert_eq!(task.xp_earned, 0);
    assert!(!task.partner_notified.on_start);
    assert!(!task.partner_notified.on_complete);
    assert!(!task.partner_notified.on_overdue);
    assert!(task.encouragement_received.is_empty());
    assert_eq!(task.created_at, task.updated_at);
}

#[test]
fn freshly_created_task_always_validates() {
    let report = quick_task("X").validate();
    assert!(report.is_valid);
    assert!(report.errors.is_empty());
}

#[test]
fn start_sets_status_and_timestamp() {
    let task = quick_task("laundry").start();
    assert_eq!(task.status, TaskStatus::InProgress);
    assert!(task.started_at.is_some());
    assert!(!task.completed);
}

#[test]
fn complete_keeps_flags_in_lockstep() {
    let task = quick_task("dishes").complete(25);

    assert!(task.completed);
    assert_eq!(task.status, TaskStatus::Completed);
    assert!(task.completed_at.is_some());
    assert_eq!(task.xp_earned, 25);
}

#[test]
fn default_completion_xp_is_ten() {
    assert_eq!(DEFAULT_COMPLETION_XP, 10);
}

#[test]
fn assign_records_parties_without_status_change() {
    let partner = Uuid::new_v4();
    let owner = Uuid::new_v4();
    let due = now_epoch_ms() + 60_000;

    let task = quick_task("water plants").assign(partner, owner, Some(due), None);

    assert_eq!(task.assigned_by, Some(partner));
    assert_eq!(task.assigned_to, Some(owner));
    assert_eq!(task.due_date, Some(due));
    assert_eq!(task.status, TaskStatus::Pending);
}

#[test]
fn add_encouragement_is_append_only() {
    let from = Uuid::new_v4();
    let task = quick_task("write essay")
        .add_encouragement("you got this", from)
        .add_encouragement("almost there", from);

    assert_eq!(task.encouragement_received.len(), 2);
    assert_eq!(task.encouragement_received[0].message, "you got this");
    assert_eq!(task.encouragement_received[1].message, "almost there");
    assert_eq!(task.encouragement_received[0].from_user_id, from);
    assert!(task.encouragement_received[0].timestamp > 0);
}

#[test]
fn mark_partner_notified_touches_one_flag_only() {
    let task = quick_task("call dentist").mark_partner_notified(PartnerNotifyKind::OnStart);

    assert!(task.partner_notified.on_start);
    assert!(!task.partner_notified.on_complete);
    assert!(!task.partner_notified.on_overdue);

    let task = task.mark_partner_notified(PartnerNotifyKind::OnOverdue);
    assert!(task.partner_notified.on_start);
    assert!(task.partner_notified.on_overdue);
    assert!(!task.partner_notified.on_complete);
}

#[test]
fn overdue_requires_past_due_date_and_incompletion() {
    let now = now_epoch_ms();
    let yesterday = now - 24 * 60 * 60 * 1000;

    let mut task = quick_task("file taxes");
    assert!(!task.is_overdue_at(now), "no due date means never overdue");

    task.due_date = Some(yesterday);
    assert!(task.is_overdue_at(now));

    let completed = task.complete(10);
    assert!(!completed.is_overdue_at(now), "completed tasks are never overdue");
}

#[test]
fn time_until_due_may_be_negative() {
    let now = now_epoch_ms();
    let mut task = quick_task("overdue thing");
    assert_eq!(task.time_until_due_at(now), None);

    task.due_date = Some(now - 5_000);
    assert_eq!(task.time_until_due_at(now), Some(-5_000));

    task.due_date = Some(now + 5_000);
    assert_eq!(task.time_until_due_at(now), Some(5_000));

    let completed = task.complete(10);
    assert_eq!(completed.time_until_due_at(now), None);
}

#[test]
fn input_validation_distinguishes_missing_and_blank_title() {
    let missing = validate_task_input(&json!({}));
    assert!(!missing.is_valid);
    assert_eq!(missing.errors, vec!["Title is required".to_string()]);

    let blank = validate_task_input(&json!({ "title": "   " }));
    assert!(!blank.is_valid);
    assert_eq!(blank.errors, vec!["Title cannot be empty".to_string()]);

    let empty = validate_task_input(&json!({ "title": "" }));
    assert_eq!(empty.errors, vec!["Title cannot be empty".to_string()]);
}

#[test]
fn input_validation_checks_enums_and_estimate() {
    let report = validate_task_input(&json!({
        "title": "ok",
        "status": "paused",
        "priority": "extreme",
        "time_estimate_minutes": -5
    }));

    assert!(!report.is_valid);
    assert!(report.errors.contains(&"Invalid task status".to_string()));
    assert!(report.errors.contains(&"Invalid task priority".to_string()));
    assert!(report
        .errors
        .contains(&"Time estimate must be a non-negative number".to_string()));
}

#[test]
fn input_validation_accepts_known_values() {
    let report = validate_task_input(&json!({
        "title": "ok",
        "status": "in_progress",
        "priority": "urgent",
        "time_estimate_minutes": 30
    }));
    assert!(report.is_valid, "unexpected errors: {:?}", report.errors);
}

#[test]
fn input_validation_rejects_non_object_with_single_generic_error() {
    let report = validate_task_input(&json!("not an object"));
    assert!(!report.is_valid);
    assert_eq!(report.errors, vec!["Task data must be an object".to_string()]);
}

#[test]
fn task_serialization_uses_snake_case_wire_fields() {
    let task = quick_task("wire check");
    let json = serde_json::to_value(&task).unwrap();

    assert_eq!(json["status"], "pending");
    assert_eq!(json["priority"], "medium");
    assert_eq!(json["completed"], false);
    assert_eq!(json["partner_notified"]["on_start"], false);

    let decoded: Task = serde_json::from_value(json).unwrap();
    assert_eq!(decoded, task);
}
