//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Guard state transitions and partnership permissions that the pure
//!   entity functions intentionally leave unchecked.
//! - Keep UI/FFI layers decoupled from storage and dispatch details.

pub mod notification_service;
pub mod partnership_service;
pub mod task_service;
