//! Domain model for the note store.
//!
//! # Responsibility
//! - Define the single note record shape shared by store and sessions.
//! - Keep title derivation rules next to the data they apply to.
//!
//! # Invariants
//! - Every note is identified by a stable `NoteId`.
//! - Deletion is represented by store-side tombstones, never by id reuse.

pub mod note;
