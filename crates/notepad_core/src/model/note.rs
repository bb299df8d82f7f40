//! Note domain model.
//!
//! # Responsibility
//! - Define the note record, its list projection and partial-update payload.
//! - Own the title derivation strategies applied at save time.
//!
//! # Invariants
//! - `id` is assigned by the store and never reused for another note.
//! - `modified_at` is store-owned; callers never supply it.
//! - A note with empty `title` and empty `body` is logically non-existent.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Stable identifier of one note.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type NoteId = uuid::Uuid;

/// Character budget of the prefix title rule.
pub const DEFAULT_PREFIX_TITLE_CHARS: usize = 9;

/// Full persisted note record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Store-assigned stable id.
    pub id: NoteId,
    /// Explicit or derived title.
    pub title: String,
    /// Note content; may be empty.
    pub body: String,
    /// Creation timestamp in epoch milliseconds.
    pub created_at: i64,
    /// Last successful write in epoch milliseconds.
    pub modified_at: i64,
}

impl Note {
    /// Returns whether this note carries no user content at all.
    pub fn is_blank(&self) -> bool {
        is_blank_content(&self.title, &self.body)
    }

    /// Projects this record into its list row shape.
    pub fn summary(&self) -> NoteSummary {
        NoteSummary {
            id: self.id,
            title: self.title.clone(),
            modified_at: self.modified_at,
        }
    }
}

/// List projection of a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteSummary {
    pub id: NoteId,
    pub title: String,
    pub modified_at: i64,
}

/// Partial update payload. `None` leaves the stored column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteFields {
    pub title: Option<String>,
    pub body: Option<String>,
}

impl NoteFields {
    /// Builds a payload replacing both title and body.
    pub fn full(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            body: Some(body.into()),
        }
    }

    /// Returns whether the payload touches no column.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.body.is_none()
    }

    /// Applies this payload on top of stored values and returns the merged
    /// `(title, body)` pair.
    pub fn merged<'a>(&'a self, title: &'a str, body: &'a str) -> (&'a str, &'a str) {
        (
            self.title.as_deref().unwrap_or(title),
            self.body.as_deref().unwrap_or(body),
        )
    }
}

/// Ordering of list projections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Most recently modified first.
    #[default]
    ModifiedDesc,
    /// Least recently modified first.
    ModifiedAsc,
    /// Case-insensitive title order.
    TitleAsc,
    /// Newest note first.
    CreatedDesc,
}

/// Rule used to fill an empty title from the body at save time.
///
/// Two historically different rules exist; neither is implied, the host
/// picks one explicitly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum TitlePolicy {
    /// First non-blank line of the body, trimmed.
    #[default]
    FirstLine,
    /// First `max_chars` characters of the body, newlines included.
    Prefix { max_chars: usize },
}

impl TitlePolicy {
    /// Prefix rule with the historical nine character budget.
    pub fn prefix() -> Self {
        Self::Prefix {
            max_chars: DEFAULT_PREFIX_TITLE_CHARS,
        }
    }

    /// Computes a title from `body` under this policy.
    pub fn derive(&self, body: &str) -> String {
        match self {
            Self::FirstLine => body
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .unwrap_or_default()
                .to_string(),
            Self::Prefix { max_chars } => body.chars().take(*max_chars).collect(),
        }
    }

    /// Returns `title` when set, otherwise the title derived from `body`.
    pub fn resolve_title(&self, title: &str, body: &str) -> String {
        if title.is_empty() {
            self.derive(body)
        } else {
            title.to_string()
        }
    }

    /// Stable config/logging label.
    pub fn label(&self) -> String {
        match self {
            Self::FirstLine => "first_line".to_string(),
            Self::Prefix { max_chars } if *max_chars == DEFAULT_PREFIX_TITLE_CHARS => {
                "prefix".to_string()
            }
            Self::Prefix { max_chars } => format!("prefix:{max_chars}"),
        }
    }
}

impl FromStr for TitlePolicy {
    type Err = TitlePolicyParseError;

    /// Accepts `first_line`, `prefix` and `prefix:<n>` (case-insensitive).
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "first_line" | "first-line" => Ok(Self::FirstLine),
            "prefix" => Ok(Self::prefix()),
            other => {
                let Some(raw_count) = other.strip_prefix("prefix:") else {
                    return Err(TitlePolicyParseError(value.to_string()));
                };
                match raw_count.trim().parse::<usize>() {
                    Ok(max_chars) if max_chars > 0 => Ok(Self::Prefix { max_chars }),
                    _ => Err(TitlePolicyParseError(value.to_string())),
                }
            }
        }
    }
}

/// Unrecognized title policy literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitlePolicyParseError(pub String);

impl Display for TitlePolicyParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unsupported title policy `{}`; expected first_line|prefix|prefix:<n>",
            self.0
        )
    }
}

impl Error for TitlePolicyParseError {}

/// Returns whether a title/body pair carries no content.
///
/// Whitespace counts as content, matching what the editor buffers hold.
pub fn is_blank_content(title: &str, body: &str) -> bool {
    title.is_empty() && body.is_empty()
}
