use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A command document was rejected by the database.
///
/// Codes follow the names document databases commonly report so operators
/// can recognise them in logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("no such command (fields: {fields})")]
    CommandNotFound { fields: String },
    #[error("bad value: {0}")]
    BadValue(String),
    #[error("collection already exists: {0}")]
    NamespaceExists(String),
    #[error("collection not found: {0}")]
    NamespaceNotFound(String),
}

impl CommandError {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::CommandNotFound { .. } => "CommandNotFound",
            Self::BadValue(_) => "BadValue",
            Self::NamespaceExists(_) => "NamespaceExists",
            Self::NamespaceNotFound(_) => "NamespaceNotFound",
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// The database rejected a command. This is the "operation failed" kind.
    #[error("command failed: {0}")]
    Command(#[from] CommandError),
    #[error("{context}")]
    Sqlite {
        context: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("stored document is not valid JSON")]
    Serialization(#[from] serde_json::Error),
    #[error("failed to prepare database file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    /// Whether the database rejected a command, as opposed to being unreachable or corrupt.
    #[must_use]
    pub fn is_command_failure(&self) -> bool {
        matches!(self, Self::Command(_))
    }

    #[must_use]
    pub fn command_error(&self) -> Option<&CommandError> {
        match self {
            Self::Command(err) => Some(err),
            _ => None,
        }
    }
}

/// Attach a human-readable context to a rusqlite failure.
pub(crate) trait SqliteContext<T> {
    fn sql_context(self, context: impl FnOnce() -> String) -> Result<T, StoreError>;
}

impl<T> SqliteContext<T> for rusqlite::Result<T> {
    fn sql_context(self, context: impl FnOnce() -> String) -> Result<T, StoreError> {
        self.map_err(|source| StoreError::Sqlite {
            context: context(),
            source,
        })
    }
}
