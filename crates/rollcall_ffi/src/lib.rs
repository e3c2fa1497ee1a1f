//! Flutter-facing boundary over `rollcall_core`.

pub mod api;
