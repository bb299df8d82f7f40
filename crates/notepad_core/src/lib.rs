//! Core domain logic for the notepad app.
//! This crate is the single source of truth for note lifecycle invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod session;

pub use config::{ConfigError, NotepadConfig};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::note::{
    Note, NoteFields, NoteId, NoteSummary, SortOrder, TitlePolicy, TitlePolicyParseError,
};
pub use repo::note_repo::{
    NoteListQuery, NoteRepository, RepoError, RepoResult, SqliteNoteRepository,
};
pub use service::note_service::{DeleteOutcome, NoteService, NoteServiceError, UpdateOutcome};
pub use session::editor::{
    CommitOutcome, EditorMode, EditorSession, ExitChoice, ExitPrompt, ExitReason, ExitRequest,
};
pub use session::list::{
    DeleteChoice, DeletePrompt, DeleteResolution, ListMode, ListSelection, ListSession,
};
pub use session::{EntryAction, OpenRequest, Route, SessionError, SessionResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
