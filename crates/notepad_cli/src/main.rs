//! Command-line host for the note store.
//!
//! # Responsibility
//! - Drive list and editor sessions from one-shot terminal commands.
//! - Resolve configuration from `NOTEPAD_*` env values and flags.
//!
//! # Invariants
//! - Every store mutation goes through a session, never the repository.
//! - Deletes require `--yes` or an interactive confirmation.

use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use notepad_core::db::open_db;
use notepad_core::{
    init_logging_from_config, CommitOutcome, DeleteChoice, DeleteResolution, EditorSession,
    ExitChoice, ExitPrompt, ExitRequest, ListMode, ListSession, NoteId, NoteService,
    NoteSummary, NotepadConfig, OpenRequest, SortOrder, SqliteNoteRepository, TitlePolicy,
};
use std::error::Error;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

type CliResult<T = ()> = Result<T, Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "notepad")]
#[command(about = "Keep short text notes in a local SQLite store")]
#[command(version)]
struct Args {
    /// SQLite file (overrides NOTEPAD_DB_PATH)
    #[arg(long, value_name = "FILE", global = true)]
    db: Option<PathBuf>,

    /// Title rule: first_line, prefix or prefix:<n> (overrides NOTEPAD_TITLE_POLICY)
    #[arg(long, value_name = "POLICY", global = true)]
    title_policy: Option<TitlePolicy>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List notes
    List {
        #[arg(long, value_enum, default_value = "modified-desc")]
        order: Order,
        /// Case-insensitive substring to match in title or body
        #[arg(long)]
        filter: Option<String>,
        /// Maximum number of notes to print
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Print one note
    Show { id: NoteId },
    /// Create a note; body is read from stdin when --body is absent
    New {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        body: Option<String>,
    },
    /// Replace the title and/or body of a note
    Edit {
        id: NoteId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        body: Option<String>,
        /// Drop the changes instead of saving them
        #[arg(long)]
        discard: bool,
        /// Allow emptying a note to delete it
        #[arg(long)]
        yes: bool,
    },
    /// Delete a note
    Delete {
        id: NoteId,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Order {
    ModifiedDesc,
    ModifiedAsc,
    TitleAsc,
    CreatedDesc,
}

impl From<Order> for SortOrder {
    fn from(value: Order) -> Self {
        match value {
            Order::ModifiedDesc => SortOrder::ModifiedDesc,
            Order::ModifiedAsc => SortOrder::ModifiedAsc,
            Order::TitleAsc => SortOrder::TitleAsc,
            Order::CreatedDesc => SortOrder::CreatedDesc,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> CliResult {
    let mut config = NotepadConfig::from_env()?;
    if let Some(db) = args.db {
        config.db_path = db;
    }
    if let Some(policy) = args.title_policy {
        config.title_policy = policy;
    }
    init_logging_from_config(&config)?;

    let conn = open_db(&config.db_path)?;
    let service = NoteService::new(SqliteNoteRepository::try_new(&conn)?);
    info!(
        "event=cli_start module=cli status=ok db_path={}",
        config.db_path.display()
    );

    match args.command {
        Command::List {
            order,
            filter,
            limit,
        } => list(&service, order.into(), filter, limit),
        Command::Show { id } => show(&service, id),
        Command::New { title, body } => {
            let body = match body {
                Some(body) => body,
                None => std::io::read_to_string(std::io::stdin())?,
            };
            let mut session =
                EditorSession::open(&service, OpenRequest::Insert, config.title_policy)?;
            if let Some(title) = title {
                session.set_title(title)?;
            }
            session.set_text(body)?;
            let outcome = session.save_and_exit(&service)?;
            report(session.note_id(), &outcome)
        }
        Command::Edit {
            id,
            title,
            body,
            discard,
            yes,
        } => edit(&service, config.title_policy, id, title, body, discard, yes),
        Command::Delete { id, yes } => delete(&service, id, yes),
    }
}

type CliService<'conn> = NoteService<SqliteNoteRepository<'conn>>;

fn list(
    service: &CliService<'_>,
    order: SortOrder,
    filter: Option<String>,
    limit: Option<u32>,
) -> CliResult {
    let items = list_rows(service, order, filter, limit)?;
    let mut out = std::io::stdout().lock();
    for item in &items {
        writeln!(out, "{}  {}  {}", item.id, item.modified_at, item.title)?;
    }
    Ok(())
}

fn list_rows(
    service: &CliService<'_>,
    order: SortOrder,
    filter: Option<String>,
    limit: Option<u32>,
) -> CliResult<Vec<NoteSummary>> {
    let mut session = ListSession::new(ListMode::Browse);
    session.set_order(order);
    session.set_filter(filter);
    session.set_limit(limit);
    Ok(session.refresh(service)?.to_vec())
}

fn show(service: &CliService<'_>, id: NoteId) -> CliResult {
    let note = service.get_note(id)?;
    let mut out = std::io::stdout().lock();
    writeln!(out, "# {}", note.title)?;
    writeln!(out, "id: {}", note.id)?;
    writeln!(out, "created_at: {}", note.created_at)?;
    writeln!(out, "modified_at: {}", note.modified_at)?;
    writeln!(out)?;
    writeln!(out, "{}", note.body)?;
    Ok(())
}

fn edit(
    service: &CliService<'_>,
    policy: TitlePolicy,
    id: NoteId,
    title: Option<String>,
    body: Option<String>,
    discard: bool,
    yes: bool,
) -> CliResult {
    let mut session = EditorSession::open(service, OpenRequest::Edit(id), policy)?;
    if let Some(title) = title {
        session.set_title(title)?;
    }
    if let Some(body) = body {
        session.set_text(body)?;
    }

    let outcome = match session.request_exit(service)? {
        ExitRequest::Closed(outcome) => outcome,
        ExitRequest::Confirm(prompt) => {
            let choice = match (prompt, discard) {
                (_, true) => ExitChoice::Discard,
                (ExitPrompt::SaveOrDiscard, false) => ExitChoice::Save,
                (ExitPrompt::DeleteOrDiscard, false) => {
                    if yes || confirm("Note is now empty. Delete it?")? {
                        ExitChoice::ConfirmDelete
                    } else {
                        ExitChoice::Discard
                    }
                }
            };
            session.resolve(service, choice)?
        }
    };
    report(id, &outcome)
}

fn delete(service: &CliService<'_>, id: NoteId, yes: bool) -> CliResult {
    let mut session = ListSession::new(ListMode::Browse);
    session.refresh(service)?;
    let header = session.request_delete(id)?.title.clone();

    let choice = if yes || confirm(&format!("Delete `{header}`?"))? {
        DeleteChoice::Confirm
    } else {
        DeleteChoice::Cancel
    };
    match session.resolve_delete(service, choice)? {
        DeleteResolution::Confirmed(outcome) => println!("{id} {outcome:?}"),
        DeleteResolution::Cancelled => println!("{id} kept"),
    }
    Ok(())
}

fn report(id: NoteId, outcome: &CommitOutcome) -> CliResult {
    match outcome {
        CommitOutcome::SaveFailed { message } => Err(format!("save failed: {message}").into()),
        CommitOutcome::Saved(note) => {
            println!("{} saved `{}`", note.id, note.title);
            Ok(())
        }
        other => {
            println!("{id} {}", other.label());
            Ok(())
        }
    }
}

fn confirm(question: &str) -> CliResult<bool> {
    let mut err = std::io::stderr().lock();
    write!(err, "{question} [y/N] ")?;
    err.flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
