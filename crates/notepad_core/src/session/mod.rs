//! Interactive sessions over the note store.
//!
//! # Responsibility
//! - Hold in-memory UI state for the list screen and the editor screen.
//! - Replace modal callbacks with pending prompt values resolved by the host.
//! - Route host entry actions to the session that should handle them.
//!
//! # Invariants
//! - Sessions never cache store handles; every store call receives the
//!   service explicitly, so commits are visible to the next pull.
//! - A prompt is pending at most once per session and must be resolved
//!   before the session can close.

use crate::model::note::NoteId;
use crate::service::note_service::NoteServiceError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod editor;
pub mod list;

/// How an editor session binds to a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenRequest {
    /// Bind to an existing note.
    Edit(NoteId),
    /// Create a new empty note and bind to it.
    Insert,
}

/// External trigger supplied by the host shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryAction {
    /// User opened an existing note.
    ViewExisting(NoteId),
    /// User asked for a new note.
    CreateNew,
    /// A caller asked the user to pick a note and wants its id back.
    Pick(NoteId),
}

/// Where an entry action leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Open an editor session with this request.
    OpenEditor(OpenRequest),
    /// Hand the id back to the caller without opening an editor.
    ReturnToCaller(NoteId),
}

impl EntryAction {
    /// Maps this action to its session route.
    pub fn route(self) -> Route {
        match self {
            Self::ViewExisting(id) => Route::OpenEditor(OpenRequest::Edit(id)),
            Self::CreateNew => Route::OpenEditor(OpenRequest::Insert),
            Self::Pick(id) => Route::ReturnToCaller(id),
        }
    }
}

/// Session-level error.
#[derive(Debug)]
pub enum SessionError {
    /// The session already finished; no further calls are accepted.
    Closed,
    /// `resolve` was called with no prompt pending.
    NoPendingPrompt,
    /// The answer does not belong to the pending prompt.
    InvalidChoice {
        prompt: &'static str,
        choice: &'static str,
    },
    /// A prompt is already pending and must be answered first.
    PromptPending(&'static str),
    /// Underlying store failure.
    Store(NoteServiceError),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "session is closed"),
            Self::NoPendingPrompt => write!(f, "no confirmation is pending"),
            Self::InvalidChoice { prompt, choice } => {
                write!(f, "choice `{choice}` does not answer prompt `{prompt}`")
            }
            Self::PromptPending(prompt) => {
                write!(f, "prompt `{prompt}` must be resolved first")
            }
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<NoteServiceError> for SessionError {
    fn from(value: NoteServiceError) -> Self {
        Self::Store(value)
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::{EntryAction, OpenRequest, Route};
    use uuid::Uuid;

    #[test]
    fn entry_actions_route_to_expected_targets() {
        let id = Uuid::new_v4();
        assert_eq!(
            EntryAction::ViewExisting(id).route(),
            Route::OpenEditor(OpenRequest::Edit(id))
        );
        assert_eq!(
            EntryAction::CreateNew.route(),
            Route::OpenEditor(OpenRequest::Insert)
        );
        assert_eq!(EntryAction::Pick(id).route(), Route::ReturnToCaller(id));
    }
}
