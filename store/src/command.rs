//! Command documents understood by the bundled drivers.
//!
//! A command is a JSON object whose verb field names both the command and
//! its target collection, e.g. `{"insert": "user", "documents": [...]}`.
//! Exactly one verb field must be present; unknown fields are rejected so a
//! typo in a descriptor fails loudly instead of silently doing less.

use serde_json::{Map, Value};

use crate::error::CommandError;
use crate::{Document, Filter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verb {
    Create,
    Drop,
    Insert,
    Update,
    Delete,
}

impl Verb {
    const ALL: [Self; 5] = [
        Self::Create,
        Self::Drop,
        Self::Insert,
        Self::Update,
        Self::Delete,
    ];

    const fn name(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Drop => "drop",
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Create {
        collection: String,
    },
    Drop {
        collection: String,
    },
    Insert {
        collection: String,
        documents: Vec<Document>,
    },
    Update {
        collection: String,
        filter: Filter,
        set: Document,
    },
    Delete {
        collection: String,
        filter: Filter,
    },
}

/// Outcome of a successful command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandReply {
    /// Documents or collections touched by the command.
    pub affected: u64,
}

impl CommandReply {
    #[must_use]
    pub const fn affected(affected: u64) -> Self {
        Self { affected }
    }
}

impl Command {
    pub fn parse(value: &Value) -> Result<Self, CommandError> {
        let Some(body) = value.as_object() else {
            return Err(CommandError::BadValue(
                "command must be a document".to_owned(),
            ));
        };

        let verbs: Vec<Verb> = Verb::ALL
            .into_iter()
            .filter(|verb| body.contains_key(verb.name()))
            .collect();
        let verb = match verbs.as_slice() {
            [verb] => *verb,
            [] => {
                let fields = body.keys().cloned().collect::<Vec<_>>().join(", ");
                return Err(CommandError::CommandNotFound { fields });
            }
            many => {
                return Err(CommandError::BadValue(format!(
                    "ambiguous command, found {}",
                    many.iter()
                        .map(|verb| verb.name())
                        .collect::<Vec<_>>()
                        .join(" and ")
                )));
            }
        };

        let name = verb.name();
        let collection = collection_name(body, name)?;
        match verb {
            Verb::Create => {
                allow_fields(body, name, &[])?;
                Ok(Self::Create { collection })
            }
            Verb::Drop => {
                allow_fields(body, name, &[])?;
                Ok(Self::Drop { collection })
            }
            Verb::Insert => {
                allow_fields(body, name, &["documents"])?;
                let documents = match body.get("documents") {
                    Some(Value::Array(items)) => items
                        .iter()
                        .map(|item| document(item, "documents[]"))
                        .collect::<Result<Vec<_>, _>>()?,
                    Some(_) => {
                        return Err(CommandError::BadValue(
                            "insert.documents must be an array".to_owned(),
                        ));
                    }
                    None => {
                        return Err(CommandError::BadValue(
                            "insert requires a documents array".to_owned(),
                        ));
                    }
                };
                Ok(Self::Insert {
                    collection,
                    documents,
                })
            }
            Verb::Update => {
                allow_fields(body, name, &["filter", "set"])?;
                let filter = optional_filter(body)?;
                let set = match body.get("set") {
                    Some(value) => document(value, "set")?,
                    None => {
                        return Err(CommandError::BadValue(
                            "update requires a set document".to_owned(),
                        ));
                    }
                };
                Ok(Self::Update {
                    collection,
                    filter,
                    set,
                })
            }
            Verb::Delete => {
                allow_fields(body, name, &["filter"])?;
                let filter = optional_filter(body)?;
                Ok(Self::Delete { collection, filter })
            }
        }
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        match self {
            Self::Create { collection }
            | Self::Drop { collection }
            | Self::Insert { collection, .. }
            | Self::Update { collection, .. }
            | Self::Delete { collection, .. } => collection,
        }
    }

    #[must_use]
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Drop { .. } => "drop",
            Self::Insert { .. } => "insert",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
        }
    }
}

fn collection_name(body: &Map<String, Value>, verb: &str) -> Result<String, CommandError> {
    match body.get(verb) {
        Some(Value::String(name)) if !name.trim().is_empty() => Ok(name.clone()),
        _ => Err(CommandError::BadValue(format!(
            "{verb} requires a non-empty collection name"
        ))),
    }
}

fn allow_fields(
    body: &Map<String, Value>,
    verb: &str,
    allowed: &[&str],
) -> Result<(), CommandError> {
    match body
        .keys()
        .find(|key| key.as_str() != verb && !allowed.contains(&key.as_str()))
    {
        Some(unknown) => Err(CommandError::BadValue(format!(
            "unknown field '{unknown}' for {verb}"
        ))),
        None => Ok(()),
    }
}

fn optional_filter(body: &Map<String, Value>) -> Result<Filter, CommandError> {
    match body.get("filter") {
        Some(value) => document(value, "filter").map(Filter::from_document),
        None => Ok(Filter::all()),
    }
}

fn document(value: &Value, what: &str) -> Result<Document, CommandError> {
    value
        .as_object()
        .cloned()
        .ok_or_else(|| CommandError::BadValue(format!("{what} must be a document")))
}

#[cfg(test)]
mod tests {
    use super::{Command, CommandError};
    use crate::Filter;
    use serde_json::json;

    #[test]
    fn parses_insert() {
        let command =
            Command::parse(&json!({"insert": "user", "documents": [{"name": "ada"}]})).unwrap();
        assert_eq!(command.verb(), "insert");
        assert_eq!(command.collection(), "user");
        let Command::Insert { documents, .. } = command else {
            panic!("expected insert");
        };
        assert_eq!(documents.len(), 1);
    }

    #[test]
    fn update_without_filter_matches_all() {
        let command = Command::parse(&json!({"update": "user", "set": {"active": true}})).unwrap();
        let Command::Update { filter, .. } = command else {
            panic!("expected update");
        };
        assert_eq!(filter, Filter::all());
    }

    #[test]
    fn unknown_verb_is_command_not_found() {
        let err = Command::parse(&json!({"eval": "db.foo.find()"})).unwrap_err();
        assert_eq!(err.code(), "CommandNotFound");
    }

    #[test]
    fn rejects_malformed_commands() {
        let cases = [
            json!("insert"),
            json!({"insert": "user"}),
            json!({"insert": "user", "documents": [1]}),
            json!({"insert": "", "documents": []}),
            json!({"drop": "user", "delete": "user"}),
            json!({"create": "user", "capped": true}),
            json!({"update": "user"}),
        ];
        for case in cases {
            let err = Command::parse(&case).unwrap_err();
            assert!(
                matches!(err, CommandError::BadValue(_)),
                "expected BadValue for {case}, got {err:?}"
            );
        }
    }
}
