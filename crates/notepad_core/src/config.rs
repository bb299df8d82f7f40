//! Runtime configuration for hosts embedding the note store.
//!
//! # Responsibility
//! - Collect database location, title policy and logging settings.
//! - Resolve them from defaults overlaid with `NOTEPAD_*` environment values.
//!
//! # Invariants
//! - Blank environment values are treated as unset.
//! - Invalid values are rejected, never silently replaced by defaults.

use crate::logging::default_log_level;
use crate::model::note::{TitlePolicy, TitlePolicyParseError};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "NOTEPAD_DB_PATH";
pub const ENV_TITLE_POLICY: &str = "NOTEPAD_TITLE_POLICY";
pub const ENV_LOG_LEVEL: &str = "NOTEPAD_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "NOTEPAD_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "notepad.sqlite3";

/// Configuration error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Title policy literal could not be parsed.
    InvalidTitlePolicy(TitlePolicyParseError),
    /// Log directory must be absolute.
    RelativeLogDir(PathBuf),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTitlePolicy(err) => write!(f, "{err}"),
            Self::RelativeLogDir(path) => {
                write!(f, "log_dir must be an absolute path, got `{}`", path.display())
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidTitlePolicy(err) => Some(err),
            Self::RelativeLogDir(_) => None,
        }
    }
}

impl From<TitlePolicyParseError> for ConfigError {
    fn from(value: TitlePolicyParseError) -> Self {
        Self::InvalidTitlePolicy(value)
    }
}

/// Host-level settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotepadConfig {
    /// SQLite database file backing the store.
    pub db_path: PathBuf,
    /// Title derivation rule handed to editor sessions.
    pub title_policy: TitlePolicy,
    /// `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute directory for rolling log files; `None` disables file logs.
    pub log_dir: Option<PathBuf>,
}

impl Default for NotepadConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            title_policy: TitlePolicy::default(),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl NotepadConfig {
    /// Builds configuration from defaults plus process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    /// Overlays values produced by `lookup` (keyed by `NOTEPAD_*` names).
    pub fn overlay(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(path) = read(ENV_DB_PATH) {
            self.db_path = PathBuf::from(path);
        }
        if let Some(policy) = read(ENV_TITLE_POLICY) {
            self.title_policy = policy.parse()?;
        }
        if let Some(level) = read(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(dir) = read(ENV_LOG_DIR) {
            self.log_dir = Some(PathBuf::from(dir));
        }

        self.validate()?;
        Ok(self)
    }

    /// Checks cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(dir) = self.log_dir.as_ref() {
            if !dir.is_absolute() {
                return Err(ConfigError::RelativeLogDir(dir.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, NotepadConfig, ENV_DB_PATH, ENV_LOG_DIR, ENV_TITLE_POLICY};
    use crate::model::note::TitlePolicy;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_use_first_line_policy() {
        let config = NotepadConfig::default();
        assert_eq!(config.title_policy, TitlePolicy::FirstLine);
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn overlay_reads_known_keys_and_ignores_blank_values() {
        let config = NotepadConfig::default()
            .overlay(lookup(&[
                (ENV_DB_PATH, "/tmp/notes.db"),
                (ENV_TITLE_POLICY, "prefix"),
                (ENV_LOG_DIR, "   "),
            ]))
            .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/notes.db"));
        assert_eq!(config.title_policy, TitlePolicy::prefix());
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn overlay_rejects_unknown_policy() {
        let err = NotepadConfig::default()
            .overlay(lookup(&[(ENV_TITLE_POLICY, "longest_line")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTitlePolicy(_)));
    }

    #[test]
    fn overlay_rejects_relative_log_dir() {
        let err = NotepadConfig::default()
            .overlay(lookup(&[(ENV_LOG_DIR, "logs/dev")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::RelativeLogDir(_)));
    }

    #[test]
    fn deserializes_from_json_with_missing_fields() {
        let config: NotepadConfig = serde_json::from_str(
            r#"{"db_path": "/data/notes.db", "title_policy": {"kind": "prefix", "max_chars": 12}}"#,
        )
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/data/notes.db"));
        assert_eq!(config.title_policy, TitlePolicy::Prefix { max_chars: 12 });
        assert!(!config.log_level.is_empty());
    }
}
