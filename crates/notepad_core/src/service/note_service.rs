//! Note store use-case service.
//!
//! # Responsibility
//! - Expose the note store contract (insert/get/list/update/delete) to
//!   sessions and host layers.
//! - Map repository failures onto the store error taxonomy.
//! - Enforce the empty-note rule on the write path.
//!
//! # Invariants
//! - Updates and deletes on vanished ids are logged no-ops, never errors.
//! - Deletes are idempotent.
//! - A note is never left persisted with both title and body empty after an
//!   update; it is deleted instead.
//! - Logs carry ids and sizes only, never note content.

use crate::model::note::{is_blank_content, Note, NoteFields, NoteId, NoteSummary};
use crate::repo::note_repo::{NoteListQuery, NoteRepository, RepoError, RepoResult};
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for note store use-cases.
#[derive(Debug)]
pub enum NoteServiceError {
    /// Storage medium could not be read or written.
    StorageUnavailable(RepoError),
    /// Target note does not exist (or was deleted between sessions).
    NoteNotFound(NoteId),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl NoteServiceError {
    /// Returns whether the failure is a storage-class error.
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_))
    }
}

impl Display for NoteServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StorageUnavailable(err) => write!(f, "storage unavailable: {err}"),
            Self::NoteNotFound(id) => write!(f, "note not found: {id}"),
            Self::InconsistentState(details) => write!(f, "inconsistent note state: {details}"),
        }
    }
}

impl Error for NoteServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StorageUnavailable(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for NoteServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NoteNotFound(id),
            other => Self::StorageUnavailable(other),
        }
    }
}

/// Result of a store update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Update applied; carries the read-back record.
    Updated(Note),
    /// The merged result was empty, so the note was deleted instead.
    DeletedEmpty,
    /// The note was already deleted; nothing was written.
    ConcurrentDeletion,
}

/// Result of a store delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// A live note was deleted by this call.
    Deleted,
    /// No live note carried the id; nothing changed.
    AlreadyAbsent,
}

/// Note store facade over repository implementations.
pub struct NoteService<R: NoteRepository> {
    repo: R,
}

impl<R: NoteRepository> NoteService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates an empty note and returns its store-assigned id.
    ///
    /// # Errors
    /// - `StorageUnavailable` when the row cannot be written; no partial
    ///   state is left behind.
    pub fn insert_note(&self) -> Result<NoteId, NoteServiceError> {
        match self.repo.insert_note() {
            Ok(id) => {
                info!("event=note_insert module=service status=ok note_id={id}");
                Ok(id)
            }
            Err(err) => {
                error!(
                    "event=note_insert module=service status=error error_code=storage_unavailable error={err}"
                );
                Err(err.into())
            }
        }
    }

    /// Gets one note by id.
    pub fn get_note(&self, id: NoteId) -> Result<Note, NoteServiceError> {
        self.repo
            .get_note(id)?
            .ok_or(NoteServiceError::NoteNotFound(id))
    }

    /// Lists note summaries using the query's ordering and filter.
    pub fn list_notes(&self, query: &NoteListQuery) -> Result<Vec<NoteSummary>, NoteServiceError> {
        let items = self.repo.list_notes(query)?;
        debug!(
            "event=note_list module=service status=ok order={:?} filtered={} count={}",
            query.order,
            query.text_filter.is_some(),
            items.len()
        );
        Ok(items)
    }

    /// Applies a partial update and refreshes `modified_at`.
    ///
    /// # Contract
    /// - A vanished id yields `UpdateOutcome::ConcurrentDeletion`.
    /// - An update that leaves both title and body empty deletes the note
    ///   and yields `UpdateOutcome::DeletedEmpty`.
    pub fn update_note(
        &self,
        id: NoteId,
        fields: &NoteFields,
    ) -> Result<UpdateOutcome, NoteServiceError> {
        let Some(current) = self.repo.get_note(id)? else {
            warn!(
                "event=note_update module=service status=skipped reason=concurrent_deletion note_id={id}"
            );
            return Ok(UpdateOutcome::ConcurrentDeletion);
        };

        let (title, body) = fields.merged(&current.title, &current.body);
        if is_blank_content(title, body) {
            self.delete_note(id)?;
            info!("event=note_update module=service status=ok action=delete_empty note_id={id}");
            return Ok(UpdateOutcome::DeletedEmpty);
        }

        match self.repo.update_note(id, fields) {
            Ok(()) => {}
            Err(RepoError::NotFound(_)) => {
                warn!(
                    "event=note_update module=service status=skipped reason=concurrent_deletion note_id={id}"
                );
                return Ok(UpdateOutcome::ConcurrentDeletion);
            }
            Err(err) => {
                error!(
                    "event=note_update module=service status=error error_code=storage_unavailable note_id={id} error={err}"
                );
                return Err(err.into());
            }
        }

        let updated = self
            .repo
            .get_note(id)?
            .ok_or(NoteServiceError::InconsistentState(
                "updated note not found in read-back",
            ))?;
        info!(
            "event=note_update module=service status=ok note_id={id} title_chars={} body_chars={}",
            updated.title.chars().count(),
            updated.body.chars().count()
        );
        Ok(UpdateOutcome::Updated(updated))
    }

    /// Deletes one note. Idempotent.
    pub fn delete_note(&self, id: NoteId) -> Result<DeleteOutcome, NoteServiceError> {
        match self.repo.delete_note(id) {
            Ok(true) => {
                info!("event=note_delete module=service status=ok note_id={id}");
                Ok(DeleteOutcome::Deleted)
            }
            Ok(false) => {
                debug!("event=note_delete module=service status=skipped reason=absent note_id={id}");
                Ok(DeleteOutcome::AlreadyAbsent)
            }
            Err(err) => {
                error!(
                    "event=note_delete module=service status=error error_code=storage_unavailable note_id={id} error={err}"
                );
                Err(err.into())
            }
        }
    }

    /// Counts live notes.
    pub fn count_notes(&self) -> RepoResult<u64> {
        self.repo.count_notes()
    }
}
