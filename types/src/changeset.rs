//! A single migration unit and its identity.

use std::borrow::Borrow;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::ContextTags;

// ============================================================================
// Identity
// ============================================================================

/// Changeset identifier, unique within a changelog.
///
/// Guaranteed non-empty after trimming. Uniqueness is a changelog-level
/// property and is checked by the engine's validator, not here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChangeSetId(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("changeset id must not be empty")]
pub struct EmptyIdError;

impl ChangeSetId {
    pub fn new(value: impl Into<String>) -> Result<Self, EmptyIdError> {
        let value = value.into();
        if value.trim().is_empty() {
            Err(EmptyIdError)
        } else {
            Ok(Self(value))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ChangeSetId {
    type Error = EmptyIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for ChangeSetId {
    type Error = EmptyIdError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ChangeSetId> for String {
    fn from(value: ChangeSetId) -> Self {
        value.0
    }
}

impl AsRef<str> for ChangeSetId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Borrow<str> for ChangeSetId {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ChangeSetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who wrote the changeset. Informational only; may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Author(String);

impl Author {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Operation payload
// ============================================================================

/// Opaque command document executed against the target database.
///
/// The engine never inspects it; only the database driver interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Operation(Value);

impl Operation {
    #[must_use]
    pub fn new(command: Value) -> Self {
        Self(command)
    }

    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for Operation {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

// ============================================================================
// ChangeSet
// ============================================================================

/// One migration unit.
///
/// `origin` and `ordinal` are assigned when the changeset is placed into a
/// [`ChangeLog`](crate::ChangeLog); standalone changesets carry an empty
/// origin and ordinal zero.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeSet {
    id: ChangeSetId,
    author: Author,
    origin: PathBuf,
    ordinal: usize,
    contexts: ContextTags,
    fail_on_error: bool,
    operations: Vec<Operation>,
}

impl ChangeSet {
    #[must_use]
    pub fn new(id: ChangeSetId, operations: Vec<Operation>) -> Self {
        Self {
            id,
            author: Author::default(),
            origin: PathBuf::new(),
            ordinal: 0,
            contexts: ContextTags::none(),
            fail_on_error: true,
            operations,
        }
    }

    #[must_use]
    pub fn with_author(mut self, author: Author) -> Self {
        self.author = author;
        self
    }

    #[must_use]
    pub fn with_contexts(mut self, contexts: ContextTags) -> Self {
        self.contexts = contexts;
        self
    }

    #[must_use]
    pub fn with_fail_on_error(mut self, fail_on_error: bool) -> Self {
        self.fail_on_error = fail_on_error;
        self
    }

    pub(crate) fn place(&mut self, origin: &Path, ordinal: usize) {
        origin.clone_into(&mut self.origin);
        self.ordinal = ordinal;
    }

    #[must_use]
    pub fn id(&self) -> &ChangeSetId {
        &self.id
    }

    #[must_use]
    pub fn author(&self) -> &Author {
        &self.author
    }

    #[must_use]
    pub fn origin(&self) -> &Path {
        &self.origin
    }

    /// Position in declared order (file order, then in-file order).
    #[must_use]
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    #[must_use]
    pub fn contexts(&self) -> &ContextTags {
        &self.contexts
    }

    #[must_use]
    pub fn fail_on_error(&self) -> bool {
        self.fail_on_error
    }

    #[must_use]
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }
}

#[cfg(test)]
mod tests {
    use super::{ChangeSet, ChangeSetId, Operation};
    use serde_json::json;

    #[test]
    fn id_rejects_blank_values() {
        assert!(ChangeSetId::new("").is_err());
        assert!(ChangeSetId::new("   ").is_err());
        assert_eq!(ChangeSetId::new("ChangeSet-1").unwrap().as_str(), "ChangeSet-1");
    }

    #[test]
    fn id_deserialization_validates() {
        let ok: Result<ChangeSetId, _> = serde_json::from_value(json!("a"));
        assert!(ok.is_ok());
        let blank: Result<ChangeSetId, _> = serde_json::from_value(json!(" "));
        assert!(blank.is_err());
    }

    #[test]
    fn changeset_defaults_to_fail_on_error() {
        let changeset = ChangeSet::new(ChangeSetId::new("a").unwrap(), Vec::new());
        assert!(changeset.fail_on_error());
        assert!(changeset.contexts().is_empty());
        assert_eq!(changeset.author().as_str(), "");
    }

    #[test]
    fn operation_is_transparent_json() {
        let op: Operation = serde_json::from_value(json!({"drop": "user"})).unwrap();
        assert_eq!(op.as_value(), &json!({"drop": "user"}));
        assert_eq!(op.into_value(), json!({"drop": "user"}));
    }
}
