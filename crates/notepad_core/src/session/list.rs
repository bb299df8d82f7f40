//! List session over all notes.
//!
//! # Responsibility
//! - Pull ordered note summaries from the store on demand.
//! - Turn row taps into editor open requests or picked ids.
//! - Gate deletes behind an explicit confirmation prompt.
//!
//! # Invariants
//! - `refresh` always re-queries; rows are never served from an older pull.
//! - `delete_note` is only called after `DeleteChoice::Confirm`.

use crate::model::note::{NoteId, NoteSummary, SortOrder};
use crate::repo::note_repo::{NoteListQuery, NoteRepository};
use crate::service::note_service::{DeleteOutcome, NoteService};
use crate::session::{OpenRequest, SessionError, SessionResult};
use log::{info, warn};

/// Why the list was opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListMode {
    /// Normal browsing; selecting a row opens the editor.
    #[default]
    Browse,
    /// A caller wants a note id back; selecting a row returns it.
    Pick,
}

/// What selecting a row leads to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListSelection {
    Open(OpenRequest),
    Picked(NoteId),
}

/// Pending delete confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletePrompt {
    pub note_id: NoteId,
    /// Row title shown as the prompt header; empty when the row is not loaded.
    pub title: String,
}

/// Host answer to a [`DeletePrompt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteChoice {
    Confirm,
    Cancel,
}

/// Result of answering a [`DeletePrompt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteResolution {
    /// The store call ran; carries what it did.
    Confirmed(DeleteOutcome),
    /// The user backed out; nothing was deleted.
    Cancelled,
}

/// In-memory state of the list screen.
#[derive(Debug, Clone, Default)]
pub struct ListSession {
    mode: ListMode,
    query: NoteListQuery,
    items: Vec<NoteSummary>,
    pending: Option<DeletePrompt>,
}

impl ListSession {
    /// Creates an empty session. Call [`ListSession::refresh`] to load rows.
    pub fn new(mode: ListMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> ListMode {
        self.mode
    }

    /// Rows from the last successful refresh.
    pub fn items(&self) -> &[NoteSummary] {
        &self.items
    }

    pub fn query(&self) -> &NoteListQuery {
        &self.query
    }

    /// Changes the ordering used by the next refresh.
    pub fn set_order(&mut self, order: SortOrder) {
        self.query.order = order;
    }

    /// Changes the text filter used by the next refresh. Blank clears it.
    pub fn set_filter(&mut self, filter: Option<String>) {
        self.query.text_filter = filter.filter(|value| !value.trim().is_empty());
    }

    /// Caps the rows returned by the next refresh. `None` lifts the cap.
    pub fn set_limit(&mut self, limit: Option<u32>) {
        self.query.limit = limit;
    }

    /// Re-executes the list query and replaces the rows.
    pub fn refresh<R: NoteRepository>(
        &mut self,
        service: &NoteService<R>,
    ) -> SessionResult<&[NoteSummary]> {
        self.items = service.list_notes(&self.query)?;
        Ok(&self.items)
    }

    /// Maps a row tap to the next step.
    pub fn select(&self, id: NoteId) -> ListSelection {
        match self.mode {
            ListMode::Browse => ListSelection::Open(OpenRequest::Edit(id)),
            ListMode::Pick => ListSelection::Picked(id),
        }
    }

    /// Requests a new note. The insert itself happens in the editor session.
    pub fn create_new(&self) -> OpenRequest {
        OpenRequest::Insert
    }

    pub fn pending_delete(&self) -> Option<&DeletePrompt> {
        self.pending.as_ref()
    }

    /// Parks a delete confirmation for `id`.
    ///
    /// # Errors
    /// - `PromptPending` when another delete is awaiting an answer.
    pub fn request_delete(&mut self, id: NoteId) -> SessionResult<&DeletePrompt> {
        if let Some(existing) = self.pending.as_ref() {
            if existing.note_id != id {
                return Err(SessionError::PromptPending("confirm_delete"));
            }
        }

        let title = self
            .items
            .iter()
            .find(|item| item.id == id)
            .map(|item| item.title.clone())
            .unwrap_or_default();
        Ok(&*self.pending.insert(DeletePrompt { note_id: id, title }))
    }

    /// Answers the pending delete prompt.
    ///
    /// A confirmed delete refreshes the rows before returning. The delete has
    /// taken effect once `Confirmed` is returned; a failed refresh afterwards
    /// only drops the deleted row from the cached items and is logged.
    pub fn resolve_delete<R: NoteRepository>(
        &mut self,
        service: &NoteService<R>,
        choice: DeleteChoice,
    ) -> SessionResult<DeleteResolution> {
        let prompt = self.pending.take().ok_or(SessionError::NoPendingPrompt)?;
        match choice {
            DeleteChoice::Cancel => Ok(DeleteResolution::Cancelled),
            DeleteChoice::Confirm => {
                let outcome = match service.delete_note(prompt.note_id) {
                    Ok(outcome) => outcome,
                    Err(err) => {
                        self.pending = Some(prompt);
                        return Err(err.into());
                    }
                };
                info!(
                    "event=list_delete module=session status=ok note_id={} outcome={outcome:?}",
                    prompt.note_id
                );
                if let Err(err) = self.refresh(service) {
                    warn!(
                        "event=list_refresh module=session status=error note_id={} error={err}",
                        prompt.note_id
                    );
                    self.items.retain(|item| item.id != prompt.note_id);
                }
                Ok(DeleteResolution::Confirmed(outcome))
            }
        }
    }
}
