//! Note repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over the canonical `notes` table.
//! - Keep SQL, timestamp arithmetic and tombstone filtering inside the
//!   persistence boundary.
//!
//! # Invariants
//! - Every read path is constrained to `is_deleted = 0`.
//! - Deleted rows stay as tombstones so their `uuid` is never handed out again.
//! - `modified_at` is computed in SQL and strictly increases on every write.

use crate::db::DbError;
use crate::model::note::{Note, NoteFields, NoteId, NoteSummary, SortOrder};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Current wall clock in epoch milliseconds, evaluated by SQLite.
const NOW_MS_SQL: &str = "CAST(ROUND((julianday('now') - 2440587.5) * 86400000.0) AS INTEGER)";

const REQUIRED_NOTE_COLUMNS: &[&str] = &[
    "uuid",
    "title",
    "body",
    "created_at",
    "modified_at",
    "is_deleted",
];

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for note persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Transport/storage failure reported by SQLite.
    Db(DbError),
    /// No live note carries the requested id.
    NotFound(NoteId),
    /// Persisted row cannot be mapped back into the domain model.
    InvalidData(String),
    /// Connection was not migrated to the expected schema.
    MissingRequiredTable(&'static str),
    /// Connection schema lacks a column the repository depends on.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "note not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted note data: {message}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "required table `{table}` is missing; was the database migrated?")
            }
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "required column `{table}.{column}` is missing")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Query options for note list use-cases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteListQuery {
    /// Row ordering. Ties always break on `uuid ASC`.
    pub order: SortOrder,
    /// Case-insensitive substring matched against title and body.
    pub text_filter: Option<String>,
    /// Maximum rows to return; `None` returns every live note.
    pub limit: Option<u32>,
    /// Number of rows to skip.
    pub offset: u32,
}

/// Repository interface for note CRUD operations.
pub trait NoteRepository {
    /// Creates one empty note and returns its freshly assigned id.
    fn insert_note(&self) -> RepoResult<NoteId>;
    /// Gets one live note by id.
    fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>>;
    /// Lists live note summaries.
    fn list_notes(&self, query: &NoteListQuery) -> RepoResult<Vec<NoteSummary>>;
    /// Applies a partial update. Returns `NotFound` when no live row matches.
    fn update_note(&self, id: NoteId, fields: &NoteFields) -> RepoResult<()>;
    /// Tombstones one note. Returns `false` when it was already gone.
    fn delete_note(&self, id: NoteId) -> RepoResult<bool>;
    /// Counts live notes.
    fn count_notes(&self) -> RepoResult<u64>;
}

/// SQLite-backed note repository.
pub struct SqliteNoteRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNoteRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_note_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl NoteRepository for SqliteNoteRepository<'_> {
    fn insert_note(&self) -> RepoResult<NoteId> {
        let id = Uuid::new_v4();
        self.conn.execute(
            &format!(
                "INSERT INTO notes (uuid, title, body, created_at, modified_at, is_deleted)
                 VALUES (?1, '', '', {NOW_MS_SQL}, {NOW_MS_SQL}, 0);"
            ),
            [id.to_string()],
        )?;
        Ok(id)
    }

    fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>> {
        let mut stmt = self.conn.prepare(
            "SELECT uuid, title, body, created_at, modified_at
             FROM notes
             WHERE uuid = ?1
               AND is_deleted = 0;",
        )?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_note_row(row)?));
        }

        Ok(None)
    }

    fn list_notes(&self, query: &NoteListQuery) -> RepoResult<Vec<NoteSummary>> {
        let mut sql = String::from(
            "SELECT uuid, title, modified_at
             FROM notes
             WHERE is_deleted = 0",
        );
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(filter) = query
            .text_filter
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
        {
            sql.push_str(" AND (title LIKE ?1 ESCAPE '\\' OR body LIKE ?1 ESCAPE '\\')");
            bind_values.push(Value::Text(like_pattern(filter)));
        }

        sql.push_str(order_clause(query.order));

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            let uuid_text: String = row.get("uuid")?;
            notes.push(NoteSummary {
                id: parse_uuid(&uuid_text)?,
                title: row.get("title")?,
                modified_at: row.get("modified_at")?,
            });
        }

        Ok(notes)
    }

    fn update_note(&self, id: NoteId, fields: &NoteFields) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE notes
                 SET
                    title = COALESCE(?2, title),
                    body = COALESCE(?3, body),
                    modified_at = MAX({NOW_MS_SQL}, modified_at + 1)
                 WHERE uuid = ?1
                   AND is_deleted = 0;"
            ),
            params![
                id.to_string(),
                fields.title.as_deref(),
                fields.body.as_deref()
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }

    fn delete_note(&self, id: NoteId) -> RepoResult<bool> {
        // Content is dropped with the row; only the id survives as a tombstone.
        let changed = self.conn.execute(
            &format!(
                "UPDATE notes
                 SET
                    title = '',
                    body = '',
                    is_deleted = 1,
                    modified_at = MAX({NOW_MS_SQL}, modified_at + 1)
                 WHERE uuid = ?1
                   AND is_deleted = 0;"
            ),
            [id.to_string()],
        )?;

        Ok(changed > 0)
    }

    fn count_notes(&self) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM notes WHERE is_deleted = 0;",
            [],
            |row| row.get(0),
        )?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative note count `{count}`")))
    }
}

fn order_clause(order: SortOrder) -> &'static str {
    match order {
        SortOrder::ModifiedDesc => " ORDER BY modified_at DESC, uuid ASC",
        SortOrder::ModifiedAsc => " ORDER BY modified_at ASC, uuid ASC",
        SortOrder::TitleAsc => " ORDER BY title COLLATE NOCASE ASC, uuid ASC",
        SortOrder::CreatedDesc => " ORDER BY created_at DESC, uuid ASC",
    }
}

/// Wraps user text in `%…%`, escaping LIKE metacharacters.
fn like_pattern(value: &str) -> String {
    let mut pattern = String::with_capacity(value.len() + 2);
    pattern.push('%');
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

fn parse_note_row(row: &Row<'_>) -> RepoResult<Note> {
    let uuid_text: String = row.get("uuid")?;
    Ok(Note {
        id: parse_uuid(&uuid_text)?,
        title: row.get("title")?,
        body: row.get("body")?,
        created_at: row.get("created_at")?,
        modified_at: row.get("modified_at")?,
    })
}

fn parse_uuid(value: &str) -> RepoResult<NoteId> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in notes.uuid")))
}

fn ensure_note_connection_ready(conn: &Connection) -> RepoResult<()> {
    if !table_exists(conn, "notes")? {
        return Err(RepoError::MissingRequiredTable("notes"));
    }

    for &column in REQUIRED_NOTE_COLUMNS {
        if !table_has_column(conn, "notes", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "notes",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::like_pattern;

    #[test]
    fn like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("plain"), "%plain%");
    }
}
