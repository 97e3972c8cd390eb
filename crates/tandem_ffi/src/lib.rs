//! Flutter-facing FFI surface for the Tandem core.

pub mod api;
