//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose stable, use-case-level functions to Dart via FRB.
//! - Keep error semantics simple for UI integration.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Mutating calls return an empty string on success and a human-readable
//!   error message on failure.
//! - Id-returning calls return the UUID string on success and an empty
//!   string on failure (details are logged).

use log::error;
use rusqlite::Connection;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;
use tandem_core::db::open_db;
use tandem_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    LogOnlyDelivery, NewTask, NewUser, NotificationService, PartnershipService,
    SqliteNotificationRepository, SqlitePartnershipRepository, SqliteTaskRepository,
    SqliteUserRepository, TaskService, User, UserRepository, UserRole,
};
use uuid::Uuid;

const DB_FILE_NAME: &str = "tandem.sqlite3";
static DB_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking, never throws.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose the core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// # FFI contract
/// - Idempotent for the same `level + log_dir`; reconfiguration attempts
///   return an error message.
/// - Never panics; returns empty string on success.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(&level, &log_dir) {
        Ok(()) => String::new(),
        Err(message) => message,
    }
}

/// Registers the application data directory where the SQLite file lives.
///
/// # FFI contract
/// - Must be called before any task/partnership function.
/// - Repeated calls with a different directory are rejected.
#[flutter_rust_bridge::frb(sync)]
pub fn init_db(data_dir: String) -> String {
    let path = PathBuf::from(data_dir).join(DB_FILE_NAME);
    if let Some(existing) = DB_PATH.get() {
        if existing != &path {
            return format!(
                "database already initialized at `{}`",
                existing.display()
            );
        }
        return String::new();
    }
    // Open once eagerly so migration failures surface at startup.
    if let Err(err) = open_db(&path) {
        return format!("failed to open database: {err}");
    }
    let _ = DB_PATH.set(path);
    String::new()
}

/// Registers a new user account and returns its id.
#[flutter_rust_bridge::frb(sync)]
pub fn user_register(email: String, name: String, role: String) -> String {
    let role = match role.as_str() {
        "partner" => UserRole::Partner,
        "both" => UserRole::Both,
        _ => UserRole::AdhdUser,
    };
    with_conn(|conn| {
        let users = SqliteUserRepository::new(conn);
        let user = User::create(NewUser { email, name, role });
        users
            .save(&user)
            .map(|id| id.to_string())
            .map_err(|err| err.to_string())
    })
}

/// Creates a task for the given owner and returns its id.
#[flutter_rust_bridge::frb(sync)]
pub fn task_quick_add(user_id: String, title: String) -> String {
    let Some(user_id) = parse_uuid(&user_id, "user_id") else {
        return String::new();
    };
    with_conn(|conn| {
        let service = task_service(conn);
        service
            .create_task(NewTask {
                user_id,
                title,
                ..NewTask::default()
            })
            .map(|task| task.id.to_string())
            .map_err(|err| err.to_string())
    })
}

/// Completes a task with the default XP award.
#[flutter_rust_bridge::frb(sync)]
pub fn task_complete(task_id: String) -> String {
    let Some(task_id) = parse_uuid(&task_id, "task_id") else {
        return "task_id is not a valid UUID".to_string();
    };
    with_conn_unit(|conn| {
        let service = task_service(conn);
        service
            .complete_task(task_id, None)
            .map(|_| ())
            .map_err(|err| err.to_string())
    })
}

/// Creates a partnership invite and returns the 6-character code.
#[flutter_rust_bridge::frb(sync)]
pub fn partnership_invite_create(sender_id: String) -> String {
    let Some(sender_id) = parse_uuid(&sender_id, "sender_id") else {
        return String::new();
    };
    with_conn(|conn| {
        let service = partnership_service(conn);
        service
            .create_invite(sender_id)
            .map(|partnership| partnership.invite_code)
            .map_err(|err| err.to_string())
    })
}

/// Redeems a partnership invite code for the given user.
#[flutter_rust_bridge::frb(sync)]
pub fn partnership_invite_accept(code: String, user_id: String) -> String {
    let Some(user_id) = parse_uuid(&user_id, "user_id") else {
        return "user_id is not a valid UUID".to_string();
    };
    with_conn_unit(|conn| {
        let service = partnership_service(conn);
        service
            .accept_invite(&code, user_id)
            .map(|_| ())
            .map_err(|err| err.to_string())
    })
}

type FfiTaskService<'conn> = TaskService<
    SqliteTaskRepository<'conn>,
    SqliteUserRepository<'conn>,
    SqlitePartnershipRepository<'conn>,
    NotificationService<
        SqliteUserRepository<'conn>,
        SqliteNotificationRepository<'conn>,
        LogOnlyDelivery,
    >,
>;

type FfiPartnershipService<'conn> = PartnershipService<
    SqlitePartnershipRepository<'conn>,
    SqliteUserRepository<'conn>,
    NotificationService<
        SqliteUserRepository<'conn>,
        SqliteNotificationRepository<'conn>,
        LogOnlyDelivery,
    >,
>;

fn notification_service(
    conn: &Connection,
) -> NotificationService<
    SqliteUserRepository<'_>,
    SqliteNotificationRepository<'_>,
    LogOnlyDelivery,
> {
    NotificationService::new(
        SqliteUserRepository::new(conn),
        SqliteNotificationRepository::new(conn),
        LogOnlyDelivery,
    )
}

fn task_service(conn: &Connection) -> FfiTaskService<'_> {
    TaskService::new(
        SqliteTaskRepository::new(conn),
        SqliteUserRepository::new(conn),
        SqlitePartnershipRepository::new(conn),
        notification_service(conn),
    )
}

fn partnership_service(conn: &Connection) -> FfiPartnershipService<'_> {
    PartnershipService::new(
        SqlitePartnershipRepository::new(conn),
        SqliteUserRepository::new(conn),
        notification_service(conn),
    )
}

fn parse_uuid(value: &str, field: &str) -> Option<Uuid> {
    match Uuid::from_str(value.trim()) {
        Ok(id) => Some(id),
        Err(err) => {
            error!("event=ffi_bad_input module=ffi status=error field={field} error={err}");
            None
        }
    }
}

/// Runs `f` against a fresh connection; id-returning contract.
fn with_conn(f: impl FnOnce(&Connection) -> Result<String, String>) -> String {
    match open_initialized_db() {
        Ok(conn) => match f(&conn) {
            Ok(value) => value,
            Err(message) => {
                error!("event=ffi_call module=ffi status=error error={message}");
                String::new()
            }
        },
        Err(message) => {
            error!("event=ffi_call module=ffi status=error error={message}");
            String::new()
        }
    }
}

/// Runs `f` against a fresh connection; empty-string-success contract.
fn with_conn_unit(f: impl FnOnce(&Connection) -> Result<(), String>) -> String {
    match open_initialized_db() {
        Ok(conn) => match f(&conn) {
            Ok(()) => String::new(),
            Err(message) => message,
        },
        Err(message) => message,
    }
}

fn open_initialized_db() -> Result<Connection, String> {
    let path = DB_PATH
        .get()
        .ok_or_else(|| "database not initialized; call init_db first".to_string())?;
    open_db(path).map_err(|err| format!("failed to open database: {err}"))
}
