//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose list/editor session flows to Dart via FRB as sync calls.
//! - Keep open editor sessions in a process-wide registry keyed by handle.
//! - Flatten core errors into response envelopes with stable meaning.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - A database connection is opened per call and never crosses threads.
//! - Closed editor sessions are removed from the registry.
//! - An invalid `NOTEPAD_*` value fails every store call; it is never
//!   replaced by defaults.

use log::{error, warn};
use notepad_core::db::open_db;
use notepad_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    CommitOutcome, DeleteChoice, DeleteResolution, EditorSession, ExitChoice, ExitRequest,
    ListMode, ListSession, Note, NoteId, NoteService, NoteSummary, NotepadConfig, OpenRequest,
    SortOrder, SqliteNoteRepository, TitlePolicy,
};
use once_cell::sync::{Lazy, OnceCell};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

type FfiService<'conn> = NoteService<SqliteNoteRepository<'conn>>;

static CONFIG: OnceCell<Result<NotepadConfig, String>> = OnceCell::new();
/// Host override set through `configure_title_policy`; wins over config.
static TITLE_POLICY: Lazy<Mutex<Option<TitlePolicy>>> = Lazy::new(|| Mutex::new(None));
static EDITOR_SESSIONS: Lazy<Mutex<HashMap<u64, EditorSession>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));
static LIST_SESSION: Lazy<Mutex<ListSession>> =
    Lazy::new(|| Mutex::new(ListSession::new(ListMode::Browse)));
static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// # FFI contract
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
/// - Safe to call repeatedly with the same `level + log_dir`.
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Selects the title derivation rule used by editors opened afterwards.
///
/// Accepts `first_line`, `prefix` or `prefix:<n>`. Returns empty string on
/// success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn configure_title_policy(policy: String) -> String {
    let parsed = match policy.parse::<TitlePolicy>() {
        Ok(parsed) => parsed,
        Err(err) => return err.to_string(),
    };
    match TITLE_POLICY.lock() {
        Ok(mut current) => {
            *current = Some(parsed);
            String::new()
        }
        Err(_) => "title policy lock poisoned".to_string(),
    }
}

/// One row of the note list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteListItem {
    /// Stable note ID in string form.
    pub note_id: String,
    pub title: String,
    /// Epoch milliseconds; the host formats relative time.
    pub modified_at: i64,
}

/// List response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesListResponse {
    pub ok: bool,
    pub items: Vec<NoteListItem>,
    pub message: String,
}

/// Full note payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteDetail {
    pub note_id: String,
    pub title: String,
    pub body: String,
    pub created_at: i64,
    pub modified_at: i64,
}

/// Single-note response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteDetailResponse {
    pub ok: bool,
    pub note: Option<NoteDetail>,
    pub message: String,
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    /// Whether operation succeeded.
    pub ok: bool,
    /// Optional prompt header or affected note ID.
    pub detail: Option<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl ActionResponse {
    fn success(message: impl Into<String>, detail: Option<String>) -> Self {
        Self {
            ok: true,
            detail,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            detail: None,
            message: message.into(),
        }
    }
}

/// Editor state envelope returned by every `editor_*` call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EditorResponse {
    pub ok: bool,
    /// Registry handle; pass it back on later calls.
    pub session_id: Option<u64>,
    pub note_id: Option<String>,
    pub title: String,
    pub body: String,
    pub dirty: bool,
    /// Pending confirmation (`save_or_discard|delete_or_discard`).
    pub prompt: Option<String>,
    /// Commit outcome label when the call committed.
    pub outcome: Option<String>,
    /// Whether the session ended and its handle is no longer valid.
    pub closed: bool,
    pub message: String,
}

impl EditorResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
            ..Self::default()
        }
    }

    fn from_session(session_id: u64, session: &EditorSession, message: impl Into<String>) -> Self {
        Self {
            ok: true,
            session_id: Some(session_id),
            note_id: Some(session.note_id().to_string()),
            title: session.current_title().to_string(),
            body: session.current_text().to_string(),
            dirty: session.is_dirty(),
            prompt: session.pending_prompt().map(|prompt| prompt.label().to_string()),
            outcome: None,
            closed: session.is_closed(),
            message: message.into(),
        }
    }

    fn with_outcome(mut self, outcome: &CommitOutcome) -> Self {
        self.outcome = Some(outcome.label().to_string());
        if let CommitOutcome::SaveFailed { message } = outcome {
            self.ok = false;
            self.message = format!("Save failed: {message}");
        }
        self
    }
}

/// Lists notes, most recently modified first unless `order` says otherwise.
///
/// # FFI contract
/// - `order`: `modified_desc|modified_asc|title_asc|created_desc`.
/// - `filter`: optional case-insensitive substring.
#[flutter_rust_bridge::frb(sync)]
pub fn notes_list(order: Option<String>, filter: Option<String>) -> NotesListResponse {
    let order = match order.as_deref().map(parse_sort_order) {
        Some(Some(order)) => order,
        Some(None) => {
            return NotesListResponse {
                ok: false,
                items: Vec::new(),
                message: "notes_list failed: unsupported order".to_string(),
            };
        }
        None => SortOrder::default(),
    };

    let result = with_list_session(|list, service| {
        list.set_order(order);
        list.set_filter(filter);
        list.refresh(service)
            .map(|items| items.iter().map(to_list_item).collect::<Vec<_>>())
            .map_err(|err| err.to_string())
    });

    match result {
        Ok(items) => NotesListResponse {
            ok: true,
            message: format!("{} note(s).", items.len()),
            items,
        },
        Err(err) => NotesListResponse {
            ok: false,
            items: Vec::new(),
            message: format!("notes_list failed: {err}"),
        },
    }
}

/// Gets one note by ID.
#[flutter_rust_bridge::frb(sync)]
pub fn note_get(note_id: String) -> NoteDetailResponse {
    let result = parse_note_id(&note_id).and_then(|id| {
        with_service(|service| service.get_note(id).map_err(|err| err.to_string()))
    });
    match result {
        Ok(note) => NoteDetailResponse {
            ok: true,
            note: Some(to_note_detail(&note)),
            message: String::new(),
        },
        Err(err) => NoteDetailResponse {
            ok: false,
            note: None,
            message: format!("note_get failed: {err}"),
        },
    }
}

/// Asks to delete a note from the list. The host must show the returned
/// header in a confirmation dialog and answer via `list_resolve_delete`.
#[flutter_rust_bridge::frb(sync)]
pub fn list_request_delete(note_id: String) -> ActionResponse {
    let id = match parse_note_id(&note_id) {
        Ok(id) => id,
        Err(err) => return ActionResponse::failure(err),
    };
    let result = lock_list().and_then(|mut list| {
        list.request_delete(id)
            .map(|prompt| prompt.title.clone())
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(title) => ActionResponse::success("Confirm delete.", Some(title)),
        Err(err) => ActionResponse::failure(format!("list_request_delete failed: {err}")),
    }
}

/// Answers the pending list delete prompt.
#[flutter_rust_bridge::frb(sync)]
pub fn list_resolve_delete(confirm: bool) -> ActionResponse {
    let choice = if confirm {
        DeleteChoice::Confirm
    } else {
        DeleteChoice::Cancel
    };
    let result = with_list_session(|list, service| {
        list.resolve_delete(service, choice)
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(DeleteResolution::Confirmed(outcome)) => {
            ActionResponse::success(format!("Delete: {outcome:?}."), None)
        }
        Ok(DeleteResolution::Cancelled) => ActionResponse::success("Delete cancelled.", None),
        Err(err) => ActionResponse::failure(format!("list_resolve_delete failed: {err}")),
    }
}

/// Opens an editor on an existing note.
#[flutter_rust_bridge::frb(sync)]
pub fn editor_open_existing(note_id: String) -> EditorResponse {
    match parse_note_id(&note_id) {
        Ok(id) => open_editor(OpenRequest::Edit(id)),
        Err(err) => EditorResponse::failure(err),
    }
}

/// Creates a new empty note and opens an editor on it.
#[flutter_rust_bridge::frb(sync)]
pub fn editor_create_new() -> EditorResponse {
    open_editor(OpenRequest::Insert)
}

/// Replaces the title buffer.
#[flutter_rust_bridge::frb(sync)]
pub fn editor_set_title(session_id: u64, title: String) -> EditorResponse {
    with_editor(session_id, |session, _| {
        session
            .set_title(title)
            .map(|()| None)
            .map_err(|err| err.to_string())
    })
}

/// Replaces the body buffer.
#[flutter_rust_bridge::frb(sync)]
pub fn editor_set_text(session_id: u64, text: String) -> EditorResponse {
    with_editor(session_id, |session, _| {
        session
            .set_text(text)
            .map(|()| None)
            .map_err(|err| err.to_string())
    })
}

/// Menu save: persists without closing.
#[flutter_rust_bridge::frb(sync)]
pub fn editor_save(session_id: u64) -> EditorResponse {
    with_editor(session_id, |session, service| {
        session
            .save(service)
            .map(Some)
            .map_err(|err| err.to_string())
    })
}

/// Back/navigate-away. Either closes or reports a pending prompt.
#[flutter_rust_bridge::frb(sync)]
pub fn editor_request_exit(session_id: u64) -> EditorResponse {
    with_editor(session_id, |session, service| {
        match session.request_exit(service) {
            Ok(ExitRequest::Closed(outcome)) => Ok(Some(outcome)),
            Ok(ExitRequest::Confirm(_)) => Ok(None),
            Err(err) => Err(err.to_string()),
        }
    })
}

/// Answers the pending exit prompt with `save|discard|confirm_delete`.
#[flutter_rust_bridge::frb(sync)]
pub fn editor_resolve(session_id: u64, choice: String) -> EditorResponse {
    let Some(choice) = parse_exit_choice(&choice) else {
        return EditorResponse::failure(format!("editor_resolve failed: unknown choice `{choice}`"));
    };
    with_editor(session_id, |session, service| {
        session
            .resolve(service, choice)
            .map(Some)
            .map_err(|err| err.to_string())
    })
}

/// Explicit discard: drops edits and closes.
#[flutter_rust_bridge::frb(sync)]
pub fn editor_discard(session_id: u64) -> EditorResponse {
    with_editor(session_id, |session, service| {
        session
            .discard_and_exit(service)
            .map(Some)
            .map_err(|err| err.to_string())
    })
}

/// Releases an editor handle the host no longer drives.
///
/// Unsaved edits are discarded first, so an inserted note the user never
/// kept does not linger. The handle is released even when that discard
/// fails.
#[flutter_rust_bridge::frb(sync)]
pub fn editor_close(session_id: u64) -> ActionResponse {
    let session = match EDITOR_SESSIONS.lock() {
        Ok(mut sessions) => sessions.remove(&session_id),
        Err(_) => return ActionResponse::failure("editor registry poisoned"),
    };
    let Some(mut session) = session else {
        return ActionResponse::failure(format!("unknown editor session {session_id}"));
    };

    match with_service(|service| {
        session
            .discard_and_exit(service)
            .map_err(|err| err.to_string())
    }) {
        Ok(outcome) => {
            ActionResponse::success("Editor closed.", Some(outcome.label().to_string()))
        }
        Err(err) => {
            warn!(
                "event=editor_close module=ffi status=error session_id={session_id} error={err}"
            );
            ActionResponse::success(format!("Editor closed; discard failed: {err}"), None)
        }
    }
}

fn open_editor(request: OpenRequest) -> EditorResponse {
    let session = match resolve_config().and_then(|config| open_session_in(config, request)) {
        Ok(session) => session,
        Err(err) => return EditorResponse::failure(format!("editor_open failed: {err}")),
    };

    let session_id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
    let response = EditorResponse::from_session(session_id, &session, "Editor opened.");
    match EDITOR_SESSIONS.lock() {
        Ok(mut sessions) => {
            sessions.insert(session_id, session);
            response
        }
        Err(_) => EditorResponse::failure("editor registry poisoned"),
    }
}

fn open_session_in(config: &NotepadConfig, request: OpenRequest) -> Result<EditorSession, String> {
    let policy = match TITLE_POLICY.lock() {
        Ok(policy) => policy.unwrap_or(config.title_policy),
        Err(_) => return Err("title policy lock poisoned".to_string()),
    };
    with_service_in(config, |service| {
        EditorSession::open(service, request, policy).map_err(|err| err.to_string())
    })
}

/// Runs `f` against a registered session, then drops it from the registry
/// when it closed.
fn with_editor(
    session_id: u64,
    f: impl FnOnce(&mut EditorSession, &FfiService<'_>) -> Result<Option<CommitOutcome>, String>,
) -> EditorResponse {
    let mut sessions = match EDITOR_SESSIONS.lock() {
        Ok(sessions) => sessions,
        Err(_) => return EditorResponse::failure("editor registry poisoned"),
    };
    let Some(session) = sessions.get_mut(&session_id) else {
        return EditorResponse::failure(format!("unknown editor session {session_id}"));
    };

    let result = with_service(|service| f(session, service));
    let response = match result {
        Ok(Some(outcome)) => {
            EditorResponse::from_session(session_id, session, "").with_outcome(&outcome)
        }
        Ok(None) => EditorResponse::from_session(session_id, session, ""),
        Err(err) => {
            let mut response = EditorResponse::from_session(session_id, session, err);
            response.ok = false;
            response
        }
    };

    if session.is_closed() {
        sessions.remove(&session_id);
    }
    response
}

fn with_list_session<T>(
    f: impl FnOnce(&mut ListSession, &FfiService<'_>) -> Result<T, String>,
) -> Result<T, String> {
    let mut list = lock_list()?;
    with_service(|service| f(&mut list, service))
}

fn lock_list() -> Result<std::sync::MutexGuard<'static, ListSession>, String> {
    LIST_SESSION
        .lock()
        .map_err(|_| "list session poisoned".to_string())
}

fn with_service<T>(f: impl FnOnce(&FfiService<'_>) -> Result<T, String>) -> Result<T, String> {
    with_service_in(resolve_config()?, f)
}

fn with_service_in<T>(
    config: &NotepadConfig,
    f: impl FnOnce(&FfiService<'_>) -> Result<T, String>,
) -> Result<T, String> {
    let conn = open_db(&config.db_path).map_err(|err| format!("DB open failed: {err}"))?;
    let repo =
        SqliteNoteRepository::try_new(&conn).map_err(|err| format!("repo init failed: {err}"))?;
    let service = NoteService::new(repo);
    f(&service)
}

fn resolve_config() -> Result<&'static NotepadConfig, String> {
    CONFIG
        .get_or_init(|| load_config(|key| std::env::var(key).ok()))
        .as_ref()
        .map_err(|err| err.clone())
}

fn load_config(lookup: impl Fn(&str) -> Option<String>) -> Result<NotepadConfig, String> {
    NotepadConfig::default().overlay(lookup).map_err(|err| {
        error!("event=config_load module=ffi status=error error={err}");
        format!("invalid configuration: {err}")
    })
}

fn parse_note_id(value: &str) -> Result<NoteId, String> {
    value
        .trim()
        .parse::<NoteId>()
        .map_err(|_| format!("invalid note id `{value}`"))
}

fn parse_sort_order(value: &str) -> Option<SortOrder> {
    match value.trim() {
        "" | "modified_desc" => Some(SortOrder::ModifiedDesc),
        "modified_asc" => Some(SortOrder::ModifiedAsc),
        "title_asc" => Some(SortOrder::TitleAsc),
        "created_desc" => Some(SortOrder::CreatedDesc),
        _ => None,
    }
}

fn parse_exit_choice(value: &str) -> Option<ExitChoice> {
    match value.trim() {
        "save" => Some(ExitChoice::Save),
        "discard" => Some(ExitChoice::Discard),
        "confirm_delete" => Some(ExitChoice::ConfirmDelete),
        _ => None,
    }
}

fn to_list_item(summary: &NoteSummary) -> NoteListItem {
    NoteListItem {
        note_id: summary.id.to_string(),
        title: summary.title.clone(),
        modified_at: summary.modified_at,
    }
}

fn to_note_detail(note: &Note) -> NoteDetail {
    NoteDetail {
        note_id: note.id.to_string(),
        title: note.title.clone(),
        body: note.body.clone(),
        created_at: note.created_at,
        modified_at: note.modified_at,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        configure_title_policy, core_version, editor_close, editor_create_new, editor_discard,
        editor_open_existing, editor_request_exit, editor_resolve, editor_set_text,
        init_logging, list_request_delete, list_resolve_delete, load_config, note_get,
        notes_list, open_session_in, ping, with_service_in,
    };
    use notepad_core::config::{ENV_DB_PATH, ENV_TITLE_POLICY};
    use notepad_core::OpenRequest;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn configure_title_policy_rejects_unknown_value() {
        assert!(!configure_title_policy("middle_line".to_string()).is_empty());
    }

    #[test]
    fn create_edit_and_save_through_prompt() {
        let token = unique_token("ffi-save");
        let opened = editor_create_new();
        assert!(opened.ok, "{}", opened.message);
        let session_id = opened.session_id.unwrap();
        let note_id = opened.note_id.clone().unwrap();

        let edited = editor_set_text(session_id, format!("{token}\nbody"));
        assert!(edited.dirty);

        let exit = editor_request_exit(session_id);
        assert_eq!(exit.prompt.as_deref(), Some("save_or_discard"));
        assert!(!exit.closed);

        let saved = editor_resolve(session_id, "save".to_string());
        assert!(saved.ok, "{}", saved.message);
        assert_eq!(saved.outcome.as_deref(), Some("saved"));
        assert!(saved.closed);

        let detail = note_get(note_id.clone()).note.unwrap();
        assert!(!detail.title.is_empty());
        assert!(detail.body.starts_with(&token));

        let listed = notes_list(None, Some(token));
        assert!(listed.items.iter().any(|item| item.note_id == note_id));

        let stale = editor_set_text(session_id, "late".to_string());
        assert!(!stale.ok);
    }

    #[test]
    fn untouched_new_note_disappears_on_exit() {
        let opened = editor_create_new();
        let note_id = opened.note_id.clone().unwrap();
        let exit = editor_request_exit(opened.session_id.unwrap());
        assert_eq!(exit.outcome.as_deref(), Some("canceled"));
        assert!(!note_get(note_id).ok);
    }

    #[test]
    fn discard_keeps_existing_body() {
        let token = unique_token("ffi-discard");
        let created = editor_create_new();
        let first = created.session_id.unwrap();
        editor_set_text(first, token.clone());
        editor_request_exit(first);
        editor_resolve(first, "save".to_string());
        let note_id = created.note_id.unwrap();

        let reopened = editor_open_existing(note_id.clone());
        let second = reopened.session_id.unwrap();
        editor_set_text(second, "changed".to_string());
        let discarded = editor_discard(second);
        assert_eq!(discarded.outcome.as_deref(), Some("discarded"));

        assert_eq!(note_get(note_id).note.unwrap().body, token);
    }

    #[test]
    fn list_delete_is_gated_by_confirmation() {
        let token = unique_token("ffi-delete");
        let created = editor_create_new();
        let session_id = created.session_id.unwrap();
        editor_set_text(session_id, token.clone());
        editor_request_exit(session_id);
        editor_resolve(session_id, "save".to_string());
        let note_id = created.note_id.unwrap();

        notes_list(None, Some(token));
        let prompt = list_request_delete(note_id.clone());
        assert!(prompt.ok, "{}", prompt.message);
        assert!(note_get(note_id.clone()).ok);

        let resolved = list_resolve_delete(true);
        assert!(resolved.ok, "{}", resolved.message);
        assert!(!note_get(note_id).ok);
    }

    #[test]
    fn invalid_ids_are_reported_not_panicked() {
        assert!(!note_get("not-a-uuid".to_string()).ok);
        assert!(!editor_open_existing("nope".to_string()).ok);
        assert!(!editor_request_exit(u64::MAX).ok);
    }

    #[test]
    fn invalid_env_value_fails_instead_of_using_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("configured.db");
        let db_path_str = db_path.to_str().unwrap().to_string();

        let err = load_config(|key| match key {
            ENV_DB_PATH => Some(db_path_str.clone()),
            ENV_TITLE_POLICY => Some("firstline".to_string()),
            _ => None,
        })
        .unwrap_err();
        assert!(err.contains("firstline"), "{err}");
        assert!(!db_path.exists());
    }

    #[test]
    fn editor_writes_go_to_configured_database() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("configured.db");
        let db_path_str = db_path.to_str().unwrap().to_string();
        let config = load_config(|key| (key == ENV_DB_PATH).then(|| db_path_str.clone())).unwrap();

        let session = open_session_in(&config, OpenRequest::Insert).unwrap();
        assert!(db_path.exists());
        let stored = with_service_in(&config, |service| {
            service
                .get_note(session.note_id())
                .map_err(|err| err.to_string())
        })
        .unwrap();
        assert_eq!(stored.id, session.note_id());
    }

    #[test]
    fn close_releases_handle_and_drops_untouched_note() {
        let opened = editor_create_new();
        let session_id = opened.session_id.unwrap();
        let note_id = opened.note_id.unwrap();

        let closed = editor_close(session_id);
        assert!(closed.ok, "{}", closed.message);
        assert_eq!(closed.detail.as_deref(), Some("discarded"));
        assert!(!note_get(note_id).ok);
        assert!(!editor_request_exit(session_id).ok);
        assert!(!editor_close(session_id).ok);
    }

    fn unique_token(prefix: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_nanos();
        format!("{prefix}-{nanos}")
    }
}
