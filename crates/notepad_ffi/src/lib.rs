//! Flutter-facing bindings over `notepad_core`.
//!
//! Generated FRB glue is expected to wrap the functions in [`api`].

pub mod api;
