//! Context tags on changesets and the context a run is configured with.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Zero or more context tags attached to a changeset.
///
/// Tags are trimmed, empty tags are dropped, and duplicates collapse while
/// declaration order is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct ContextTags(Vec<String>);

impl ContextTags {
    #[must_use]
    pub fn none() -> Self {
        Self(Vec::new())
    }

    /// Parse a comma-separated tag list such as `"users, organizations"`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        raw.split(',').collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Exact, case-sensitive membership.
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }
}

impl<S: AsRef<str>> FromIterator<S> for ContextTags {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut tags: Vec<String> = Vec::new();
        for tag in iter {
            let tag = tag.as_ref().trim();
            if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_owned());
            }
        }
        Self(tags)
    }
}

impl From<Vec<String>> for ContextTags {
    fn from(value: Vec<String>) -> Self {
        value.into_iter().collect()
    }
}

impl From<ContextTags> for Vec<String> {
    fn from(value: ContextTags) -> Self {
        value.0
    }
}

impl fmt::Display for ContextTags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(","))
    }
}

/// The context a run is configured with. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RunContext(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("run context must not be empty")]
pub struct EmptyContextError;

impl RunContext {
    pub fn new(value: impl Into<String>) -> Result<Self, EmptyContextError> {
        let value = value.into();
        if value.trim().is_empty() {
            Err(EmptyContextError)
        } else {
            Ok(Self(value))
        }
    }

    /// Treats a missing or blank value as "no context".
    #[must_use]
    pub fn from_optional(value: Option<&str>) -> Option<Self> {
        value.and_then(|v| Self::new(v.trim()).ok())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RunContext {
    type Error = EmptyContextError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RunContext> for String {
    fn from(value: RunContext) -> Self {
        value.0
    }
}

impl fmt::Display for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::{ContextTags, RunContext};

    #[test]
    fn parse_trims_and_drops_empty_tags() {
        let tags = ContextTags::parse(" users, ,organizations,users ");
        assert_eq!(tags.iter().collect::<Vec<_>>(), vec!["users", "organizations"]);
    }

    #[test]
    fn parse_of_blank_string_is_untagged() {
        assert!(ContextTags::parse("").is_empty());
        assert!(ContextTags::parse(" , ").is_empty());
    }

    #[test]
    fn contains_is_case_sensitive() {
        let tags = ContextTags::parse("Users");
        assert!(tags.contains("Users"));
        assert!(!tags.contains("users"));
    }

    #[test]
    fn run_context_from_optional_normalizes_blank() {
        assert_eq!(RunContext::from_optional(None), None);
        assert_eq!(RunContext::from_optional(Some("  ")), None);
        assert_eq!(
            RunContext::from_optional(Some(" users ")).map(|c| c.as_str().to_owned()),
            Some("users".to_owned())
        );
    }
}
