//! Editor session for one note.
//!
//! # Responsibility
//! - Bind to one note (existing or freshly inserted) and hold its edit buffers.
//! - Track dirty state against the snapshot captured at open or last save.
//! - Apply the exit policy: discard, delete, skip, or update.
//! - Gate navigate-away exits behind a save/discard or delete/discard prompt.
//!
//! # Invariants
//! - The mode is fixed at open; `Insert` never turns into `Edit`.
//! - `update_note` is never called on the discard path or for clean buffers.
//! - A storage failure while saving keeps the session open with its buffers.
//! - Once a commit succeeds the session is closed for good.

use crate::model::note::{is_blank_content, Note, NoteFields, NoteId, TitlePolicy};
use crate::repo::note_repo::NoteRepository;
use crate::service::note_service::{NoteService, NoteServiceError, UpdateOutcome};
use crate::session::{OpenRequest, SessionError, SessionResult};
use log::{error, info, warn};

/// Binding mode chosen when the session opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorMode {
    /// Bound to a note that existed before the session.
    Edit,
    /// Bound to a note this session inserted.
    Insert,
}

/// Why the session is ending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The view is going away for good without an explicit choice.
    Navigate,
    /// User pressed save.
    Save,
    /// User declined to keep the edits.
    Discard,
    /// User confirmed deleting the note.
    ConfirmDelete,
}

/// Confirmation the host must show before a dirty session can exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitPrompt {
    /// Buffers changed: save and exit, or discard and exit.
    SaveOrDiscard,
    /// An existing note was emptied: delete and exit, or discard and exit.
    DeleteOrDiscard,
}

impl ExitPrompt {
    pub fn label(self) -> &'static str {
        match self {
            Self::SaveOrDiscard => "save_or_discard",
            Self::DeleteOrDiscard => "delete_or_discard",
        }
    }

    /// Returns whether `choice` is one of this prompt's two answers.
    pub fn accepts(self, choice: ExitChoice) -> bool {
        matches!(
            (self, choice),
            (Self::SaveOrDiscard, ExitChoice::Save | ExitChoice::Discard)
                | (
                    Self::DeleteOrDiscard,
                    ExitChoice::ConfirmDelete | ExitChoice::Discard
                )
        )
    }
}

/// Host answer to an [`ExitPrompt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitChoice {
    Save,
    Discard,
    ConfirmDelete,
}

impl ExitChoice {
    pub fn label(self) -> &'static str {
        match self {
            Self::Save => "save",
            Self::Discard => "discard",
            Self::ConfirmDelete => "confirm_delete",
        }
    }

    fn reason(self) -> ExitReason {
        match self {
            Self::Save => ExitReason::Save,
            Self::Discard => ExitReason::Discard,
            Self::ConfirmDelete => ExitReason::ConfirmDelete,
        }
    }
}

/// What a commit did to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Buffers were clean; no store call was made.
    Unchanged,
    /// Buffers were written; carries the stored record.
    Saved(Note),
    /// Both buffers were empty, so the note was deleted.
    Canceled,
    /// The user confirmed deleting the note.
    Deleted,
    /// Edits were dropped; an inserted note was deleted.
    Discarded,
    /// The note vanished underneath the session; nothing was written.
    ConcurrentDeletion,
    /// The store rejected the write. Buffers are kept and the session stays
    /// open so the user can retry.
    SaveFailed { message: String },
}

impl CommitOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unchanged => "unchanged",
            Self::Saved(_) => "saved",
            Self::Canceled => "canceled",
            Self::Deleted => "deleted",
            Self::Discarded => "discarded",
            Self::ConcurrentDeletion => "concurrent_deletion",
            Self::SaveFailed { .. } => "save_failed",
        }
    }

    /// Returns whether the session is still open after this outcome.
    pub fn keeps_session_open(&self) -> bool {
        matches!(self, Self::SaveFailed { .. })
    }
}

/// Result of a navigate-away request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitRequest {
    /// No confirmation was needed; the session committed and closed.
    Closed(CommitOutcome),
    /// The host must show this prompt and answer via `resolve`.
    Confirm(ExitPrompt),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Snapshot {
    title: String,
    body: String,
}

impl From<&Note> for Snapshot {
    fn from(note: &Note) -> Self {
        Self {
            title: note.title.clone(),
            body: note.body.clone(),
        }
    }
}

/// In-memory state of the currently open note.
///
/// All fields are session-scoped and set at [`EditorSession::open`].
#[derive(Debug, Clone)]
pub struct EditorSession {
    note_id: NoteId,
    mode: EditorMode,
    policy: TitlePolicy,
    original: Snapshot,
    title: String,
    body: String,
    pending: Option<ExitPrompt>,
    closed: bool,
}

impl EditorSession {
    /// Opens a session for `request`.
    ///
    /// # Errors
    /// - `Store(StorageUnavailable)` when a new note cannot be inserted.
    /// - `Store(NoteNotFound)` when the target note cannot be fetched.
    /// - `Store(StorageUnavailable)` when the freshly inserted note cannot be
    ///   read back; the inserted row is deleted before returning.
    pub fn open<R: NoteRepository>(
        service: &NoteService<R>,
        request: OpenRequest,
        policy: TitlePolicy,
    ) -> SessionResult<Self> {
        let (mode, note_id) = match request {
            OpenRequest::Edit(id) => (EditorMode::Edit, id),
            OpenRequest::Insert => (EditorMode::Insert, service.insert_note()?),
        };

        let note = match service.get_note(note_id) {
            Ok(note) => note,
            Err(err) => {
                error!(
                    "event=editor_open module=session status=error mode={mode:?} note_id={note_id} error={err}"
                );
                if mode == EditorMode::Insert {
                    // The empty row must not outlive a failed open.
                    if let Err(cleanup) = service.delete_note(note_id) {
                        warn!(
                            "event=editor_open_cleanup module=session status=error note_id={note_id} error={cleanup}"
                        );
                    }
                }
                return Err(err.into());
            }
        };

        info!(
            "event=editor_open module=session status=ok mode={mode:?} note_id={note_id} title_policy={}",
            policy.label()
        );
        let original = Snapshot::from(&note);
        Ok(Self {
            note_id,
            mode,
            policy,
            title: original.title.clone(),
            body: original.body.clone(),
            original,
            pending: None,
            closed: false,
        })
    }

    pub fn note_id(&self) -> NoteId {
        self.note_id
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn title_policy(&self) -> TitlePolicy {
        self.policy
    }

    /// Live title buffer.
    pub fn current_title(&self) -> &str {
        &self.title
    }

    /// Live body buffer.
    pub fn current_text(&self) -> &str {
        &self.body
    }

    /// Replaces the title buffer. Editing dismisses any pending prompt.
    pub fn set_title(&mut self, title: impl Into<String>) -> SessionResult<()> {
        self.ensure_open()?;
        self.title = title.into();
        self.pending = None;
        Ok(())
    }

    /// Replaces the body buffer. Editing dismisses any pending prompt.
    pub fn set_text(&mut self, body: impl Into<String>) -> SessionResult<()> {
        self.ensure_open()?;
        self.body = body.into();
        self.pending = None;
        Ok(())
    }

    /// Returns whether the buffers differ from the last loaded or saved state.
    pub fn is_dirty(&self) -> bool {
        self.title != self.original.title || self.body != self.original.body
    }

    pub fn pending_prompt(&self) -> Option<ExitPrompt> {
        self.pending
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Asks to leave the editor without an explicit save or discard.
    ///
    /// Clean sessions commit immediately (no update call; an untouched
    /// inserted note is removed). Dirty sessions park a prompt instead.
    pub fn request_exit<R: NoteRepository>(
        &mut self,
        service: &NoteService<R>,
    ) -> SessionResult<ExitRequest> {
        self.ensure_open()?;
        if let Some(prompt) = self.pending {
            return Ok(ExitRequest::Confirm(prompt));
        }

        if !self.is_dirty() {
            return self
                .commit_on_exit(service, ExitReason::Navigate)
                .map(ExitRequest::Closed);
        }

        let prompt = if self.mode == EditorMode::Edit && self.buffers_blank() {
            ExitPrompt::DeleteOrDiscard
        } else {
            ExitPrompt::SaveOrDiscard
        };
        info!(
            "event=editor_exit_prompt module=session status=pending note_id={} prompt={}",
            self.note_id,
            prompt.label()
        );
        self.pending = Some(prompt);
        Ok(ExitRequest::Confirm(prompt))
    }

    /// Dismisses the pending prompt and keeps editing.
    pub fn cancel_exit(&mut self) -> SessionResult<()> {
        self.ensure_open()?;
        self.pending = None;
        Ok(())
    }

    /// Answers the pending prompt and commits accordingly.
    ///
    /// # Errors
    /// - `NoPendingPrompt` when nothing is pending.
    /// - `InvalidChoice` when `choice` does not answer the pending prompt;
    ///   the prompt stays pending.
    pub fn resolve<R: NoteRepository>(
        &mut self,
        service: &NoteService<R>,
        choice: ExitChoice,
    ) -> SessionResult<CommitOutcome> {
        self.ensure_open()?;
        let prompt = self.pending.ok_or(SessionError::NoPendingPrompt)?;
        if !prompt.accepts(choice) {
            return Err(SessionError::InvalidChoice {
                prompt: prompt.label(),
                choice: choice.label(),
            });
        }
        self.commit_on_exit(service, choice.reason())
    }

    /// Explicit save button: commit and close.
    pub fn save_and_exit<R: NoteRepository>(
        &mut self,
        service: &NoteService<R>,
    ) -> SessionResult<CommitOutcome> {
        self.commit_on_exit(service, ExitReason::Save)
    }

    /// Explicit discard: drop edits and close.
    pub fn discard_and_exit<R: NoteRepository>(
        &mut self,
        service: &NoteService<R>,
    ) -> SessionResult<CommitOutcome> {
        self.commit_on_exit(service, ExitReason::Discard)
    }

    /// Applies the exit policy once, when the session ends.
    ///
    /// Evaluated in order:
    /// 1. `Discard` deletes an inserted note and leaves existing notes alone.
    /// 2. `ConfirmDelete` deletes the note.
    /// 3. Empty title and body delete the note (`Canceled`).
    /// 4. Clean buffers make no store call (`Unchanged`).
    /// 5. Otherwise the buffers are written with a derived title if needed.
    pub fn commit_on_exit<R: NoteRepository>(
        &mut self,
        service: &NoteService<R>,
        reason: ExitReason,
    ) -> SessionResult<CommitOutcome> {
        self.ensure_open()?;
        self.pending = None;

        let outcome = match reason {
            ExitReason::Discard => {
                if self.mode == EditorMode::Insert {
                    service.delete_note(self.note_id)?;
                }
                CommitOutcome::Discarded
            }
            ExitReason::ConfirmDelete => {
                service.delete_note(self.note_id)?;
                CommitOutcome::Deleted
            }
            ExitReason::Navigate | ExitReason::Save => {
                if self.buffers_blank() {
                    service.delete_note(self.note_id)?;
                    CommitOutcome::Canceled
                } else if !self.is_dirty() {
                    CommitOutcome::Unchanged
                } else {
                    self.persist(service)?
                }
            }
        };

        if !outcome.keeps_session_open() {
            self.closed = true;
        }
        info!(
            "event=editor_commit module=session status=ok note_id={} mode={:?} reason={reason:?} outcome={}",
            self.note_id,
            self.mode,
            outcome.label()
        );
        Ok(outcome)
    }

    /// Menu save: writes dirty buffers without ending the session.
    ///
    /// Blank buffers are left for the exit policy to handle. After a
    /// successful save the buffers and snapshot both hold the stored values.
    pub fn save<R: NoteRepository>(
        &mut self,
        service: &NoteService<R>,
    ) -> SessionResult<CommitOutcome> {
        self.ensure_open()?;
        if self.buffers_blank() || !self.is_dirty() {
            return Ok(CommitOutcome::Unchanged);
        }

        let outcome = self.persist(service)?;
        match &outcome {
            CommitOutcome::Saved(note) => {
                self.original = Snapshot::from(note);
                self.title = note.title.clone();
                self.body = note.body.clone();
            }
            CommitOutcome::ConcurrentDeletion | CommitOutcome::Canceled => self.closed = true,
            _ => {}
        }
        Ok(outcome)
    }

    /// Pulls the stored record again.
    ///
    /// A clean session adopts the stored values; dirty buffers are kept.
    ///
    /// # Errors
    /// - `Store(NoteNotFound)` when the note vanished.
    pub fn refresh<R: NoteRepository>(&mut self, service: &NoteService<R>) -> SessionResult<()> {
        self.ensure_open()?;
        let note = service.get_note(self.note_id)?;
        if !self.is_dirty() {
            self.original = Snapshot::from(&note);
            self.title = note.title;
            self.body = note.body;
        }
        Ok(())
    }

    fn persist<R: NoteRepository>(
        &self,
        service: &NoteService<R>,
    ) -> SessionResult<CommitOutcome> {
        let title = self.policy.resolve_title(&self.title, &self.body);
        let fields = NoteFields::full(title, self.body.clone());
        match service.update_note(self.note_id, &fields) {
            Ok(UpdateOutcome::Updated(note)) => Ok(CommitOutcome::Saved(note)),
            Ok(UpdateOutcome::DeletedEmpty) => Ok(CommitOutcome::Canceled),
            Ok(UpdateOutcome::ConcurrentDeletion) => {
                warn!(
                    "event=editor_save module=session status=skipped reason=concurrent_deletion note_id={}",
                    self.note_id
                );
                Ok(CommitOutcome::ConcurrentDeletion)
            }
            Err(NoteServiceError::NoteNotFound(_)) => Ok(CommitOutcome::ConcurrentDeletion),
            Err(err) if err.is_storage_unavailable() => {
                error!(
                    "event=editor_save module=session status=error error_code=storage_unavailable note_id={} error={err}",
                    self.note_id
                );
                Ok(CommitOutcome::SaveFailed {
                    message: err.to_string(),
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    fn buffers_blank(&self) -> bool {
        is_blank_content(&self.title, &self.body)
    }

    fn ensure_open(&self) -> SessionResult<()> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        Ok(())
    }
}
