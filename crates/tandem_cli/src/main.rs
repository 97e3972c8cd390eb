//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `tandem_core` linkage.
//! - Exercise one create/complete round-trip against an in-memory store.

use tandem_core::db::open_db_in_memory;
use tandem_core::{
    LogOnlyDelivery, NewTask, NewUser, NotificationService, SqliteNotificationRepository,
    SqlitePartnershipRepository, SqliteTaskRepository, SqliteUserRepository, TaskService, User,
    UserRepository,
};

fn main() {
    println!("tandem_core ping={}", tandem_core::ping());
    println!("tandem_core version={}", tandem_core::core_version());

    // Tiny end-to-end probe: user -> task -> complete, all in memory.
    let conn = open_db_in_memory().expect("in-memory db should open");
    let users = SqliteUserRepository::new(&conn);
    let owner = User::create(NewUser {
        email: "smoke@example.com".to_string(),
        name: "Smoke Test".to_string(),
        ..NewUser::default()
    });
    users.save(&owner).expect("user should save");

    let service = TaskService::new(
        SqliteTaskRepository::new(&conn),
        SqliteUserRepository::new(&conn),
        SqlitePartnershipRepository::new(&conn),
        NotificationService::new(
            SqliteUserRepository::new(&conn),
            SqliteNotificationRepository::new(&conn),
            LogOnlyDelivery,
        ),
    );

    let task = service
        .create_task(NewTask {
            user_id: owner.id,
            title: "smoke task".to_string(),
            ..NewTask::default()
        })
        .expect("task should create");
    let task = service
        .complete_task(task.id, None)
        .expect("task should complete");

    println!(
        "tandem_core smoke task={} completed={} xp={}",
        task.id, task.completed, task.xp_earned
    );
}
