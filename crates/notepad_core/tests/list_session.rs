use notepad_core::db::{open_db_in_memory, DbError};
use notepad_core::{
    DeleteChoice, DeleteOutcome, DeleteResolution, EditorSession, EntryAction, ListMode,
    ListSelection, ListSession, Note, NoteFields, NoteId, NoteListQuery, NoteRepository,
    NoteService, NoteSummary, OpenRequest, RepoError, RepoResult, Route, SessionError,
    SortOrder, SqliteNoteRepository, TitlePolicy,
};
use rusqlite::{params, Connection};
use std::cell::Cell;

fn service(conn: &Connection) -> NoteService<SqliteNoteRepository<'_>> {
    NoteService::new(SqliteNoteRepository::try_new(conn).unwrap())
}

fn seed(service: &NoteService<SqliteNoteRepository<'_>>, title: &str) -> NoteId {
    let id = service.insert_note().unwrap();
    service
        .update_note(id, &NoteFields::full(title, format!("{title} body")))
        .unwrap();
    id
}

#[test]
fn refresh_reflects_latest_committed_state() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let mut list = ListSession::new(ListMode::Browse);
    assert!(list.refresh(&service).unwrap().is_empty());

    let first = seed(&service, "first");
    assert_eq!(list.refresh(&service).unwrap().len(), 1);

    service
        .update_note(first, &NoteFields::full("renamed", "body"))
        .unwrap();
    let items = list.refresh(&service).unwrap();
    assert_eq!(items[0].title, "renamed");
}

#[test]
fn editor_commit_is_visible_to_the_next_refresh() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let mut list = ListSession::new(ListMode::Browse);

    let request = list.create_new();
    assert_eq!(request, OpenRequest::Insert);
    let mut editor = EditorSession::open(&service, request, TitlePolicy::FirstLine).unwrap();
    editor.set_text("Groceries\nmilk").unwrap();
    editor.save_and_exit(&service).unwrap();

    let items = list.refresh(&service).unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, editor.note_id());
    assert_eq!(items[0].title, "Groceries");
}

#[test]
fn select_opens_editor_in_browse_mode_and_returns_id_in_pick_mode() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let id = seed(&service, "note");

    let browse = ListSession::new(ListMode::Browse);
    assert_eq!(browse.select(id), ListSelection::Open(OpenRequest::Edit(id)));

    let pick = ListSession::new(ListMode::Pick);
    assert_eq!(pick.select(id), ListSelection::Picked(id));
    assert_eq!(EntryAction::Pick(id).route(), Route::ReturnToCaller(id));
}

#[test]
fn delete_requires_confirmation() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let id = seed(&service, "doomed");
    let mut list = ListSession::new(ListMode::Browse);
    list.refresh(&service).unwrap();

    let prompt = list.request_delete(id).unwrap();
    assert_eq!(prompt.title, "doomed");
    assert!(service.get_note(id).is_ok());

    assert_eq!(
        list.resolve_delete(&service, DeleteChoice::Cancel).unwrap(),
        DeleteResolution::Cancelled
    );
    assert!(service.get_note(id).is_ok());
    assert!(list.pending_delete().is_none());

    list.request_delete(id).unwrap();
    assert_eq!(
        list.resolve_delete(&service, DeleteChoice::Confirm).unwrap(),
        DeleteResolution::Confirmed(DeleteOutcome::Deleted)
    );
    assert!(service.get_note(id).is_err());
    assert!(list.items().is_empty());
}

#[test]
fn confirming_delete_of_vanished_note_is_not_an_error() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let id = seed(&service, "twice");
    let mut list = ListSession::new(ListMode::Browse);
    list.refresh(&service).unwrap();

    list.request_delete(id).unwrap();
    service.delete_note(id).unwrap();
    assert_eq!(
        list.resolve_delete(&service, DeleteChoice::Confirm).unwrap(),
        DeleteResolution::Confirmed(DeleteOutcome::AlreadyAbsent)
    );
}

#[test]
fn only_one_delete_prompt_at_a_time() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let first = seed(&service, "a");
    let second = seed(&service, "b");
    let mut list = ListSession::new(ListMode::Browse);

    list.request_delete(first).unwrap();
    assert!(matches!(
        list.request_delete(second),
        Err(SessionError::PromptPending(_))
    ));
    assert!(matches!(
        ListSession::new(ListMode::Browse).resolve_delete(&service, DeleteChoice::Confirm),
        Err(SessionError::NoPendingPrompt)
    ));
}

#[test]
fn order_and_filter_apply_on_next_refresh() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let zebra = seed(&service, "zebra");
    let apple = seed(&service, "apple");
    conn.execute(
        "UPDATE notes SET modified_at = ?2 WHERE uuid = ?1;",
        params![apple.to_string(), 1_i64],
    )
    .unwrap();

    let mut list = ListSession::new(ListMode::Browse);
    assert_eq!(list.refresh(&service).unwrap()[0].id, zebra);

    list.set_order(SortOrder::TitleAsc);
    assert_eq!(list.refresh(&service).unwrap()[0].id, apple);

    list.set_filter(Some("zeb".to_string()));
    let filtered = list.refresh(&service).unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].id, zebra);

    list.set_filter(Some("   ".to_string()));
    assert!(list.query().text_filter.is_none());
}

#[test]
fn limit_caps_rows_on_next_refresh() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    for title in ["a", "b", "c"] {
        seed(&service, title);
    }

    let mut list = ListSession::new(ListMode::Browse);
    list.set_limit(Some(2));
    assert_eq!(list.query().limit, Some(2));
    assert_eq!(list.refresh(&service).unwrap().len(), 2);

    list.set_limit(None);
    assert_eq!(list.refresh(&service).unwrap().len(), 3);
}

/// Listing breaks as soon as a delete went through.
struct ListBreaksAfterDelete<'conn> {
    inner: SqliteNoteRepository<'conn>,
    deleted: Cell<bool>,
}

impl NoteRepository for ListBreaksAfterDelete<'_> {
    fn insert_note(&self) -> RepoResult<NoteId> {
        self.inner.insert_note()
    }

    fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>> {
        self.inner.get_note(id)
    }

    fn list_notes(&self, query: &NoteListQuery) -> RepoResult<Vec<NoteSummary>> {
        if self.deleted.get() {
            return Err(RepoError::Db(DbError::Sqlite(
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_IOERR),
                    None,
                ),
            )));
        }
        self.inner.list_notes(query)
    }

    fn update_note(&self, id: NoteId, fields: &NoteFields) -> RepoResult<()> {
        self.inner.update_note(id, fields)
    }

    fn delete_note(&self, id: NoteId) -> RepoResult<bool> {
        let deleted = self.inner.delete_note(id)?;
        self.deleted.set(true);
        Ok(deleted)
    }

    fn count_notes(&self) -> RepoResult<u64> {
        self.inner.count_notes()
    }
}

#[test]
fn confirmed_delete_survives_failed_refresh() {
    let conn = open_db_in_memory().unwrap();
    let keep = seed(&service(&conn), "keep");
    let gone = seed(&service(&conn), "gone");
    let flaky = NoteService::new(ListBreaksAfterDelete {
        inner: SqliteNoteRepository::try_new(&conn).unwrap(),
        deleted: Cell::new(false),
    });

    let mut list = ListSession::new(ListMode::Browse);
    assert_eq!(list.refresh(&flaky).unwrap().len(), 2);
    list.request_delete(gone).unwrap();

    let resolution = list.resolve_delete(&flaky, DeleteChoice::Confirm).unwrap();
    assert_eq!(resolution, DeleteResolution::Confirmed(DeleteOutcome::Deleted));
    assert!(list.pending_delete().is_none());
    let cached: Vec<NoteId> = list.items().iter().map(|item| item.id).collect();
    assert_eq!(cached, vec![keep]);
    assert!(service(&conn).get_note(gone).is_err());
}
