//! Changelog descriptors.
//!
//! A master file lists change files; each change file lists changesets.
//!
//! ```toml
//! # changelog.toml
//! [[changefiles]]
//! path = "changesets/users.toml"
//! ```
//!
//! ```toml
//! # changesets/users.toml
//! [[changeset]]
//! id = "users-1"
//! author = "ops"
//! context = "users"            # or ["users", "organizations"]
//! fail_on_error = false
//!
//! [[changeset.operation]]
//! insert = "user"
//! documents = [{ name = "ada" }]
//! ```
//!
//! Change file paths are resolved relative to the master file. A master file
//! with no `changefiles`, or change files with no `changeset`, produce an empty
//! changelog. Duplicate ids are left for the engine's validator to report.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Number, Value};
use thiserror::Error;

use ferry_types::{Author, ChangeLog, ChangeSet, ChangeSetId, ContextTags, Operation};

#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("failed to read descriptor {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse descriptor {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid changeset #{index} in {}: {reason}", path.display())]
    InvalidChangeSet {
        path: PathBuf,
        index: usize,
        reason: String,
    },
}

impl DescriptorError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Read { path, .. }
            | Self::Parse { path, .. }
            | Self::InvalidChangeSet { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    /// Applied to changesets that do not set `fail_on_error` themselves.
    pub default_fail_on_error: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            default_fail_on_error: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct MasterFile {
    #[serde(default)]
    changefiles: Vec<ChangeFileRef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ChangeFileRef {
    path: PathBuf,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ChangeFile {
    #[serde(default)]
    changeset: Vec<RawChangeSet>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawChangeSet {
    id: String,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    context: Option<RawContext>,
    #[serde(default)]
    fail_on_error: Option<bool>,
    #[serde(default)]
    operation: Vec<toml::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawContext {
    List(String),
    Tags(Vec<String>),
}

impl RawContext {
    fn into_tags(self) -> ContextTags {
        match self {
            Self::List(raw) => ContextTags::parse(&raw),
            Self::Tags(tags) => tags.into_iter().collect(),
        }
    }
}

/// Load the changelog declared by `master`.
pub fn load(
    master: impl AsRef<Path>,
    options: &LoadOptions,
) -> Result<ChangeLog, DescriptorError> {
    let master = master.as_ref();
    let descriptor: MasterFile = read_toml(master)?;
    let base = master.parent().unwrap_or_else(|| Path::new(""));

    let mut builder = ChangeLog::builder();
    for file in descriptor.changefiles {
        let path = base.join(&file.path);
        let changesets = load_change_file(&path, options)?;
        tracing::debug!(path = %path.display(), count = changesets.len(), "Loaded change file");
        builder = builder.source(&path, changesets);
    }

    let changelog = builder.build();
    tracing::info!(
        master = %master.display(),
        sources = changelog.sources().len(),
        changesets = changelog.len(),
        "Changelog loaded"
    );
    Ok(changelog)
}

/// Parse the changesets of a single change file.
pub fn load_change_file(
    path: &Path,
    options: &LoadOptions,
) -> Result<Vec<ChangeSet>, DescriptorError> {
    let file: ChangeFile = read_toml(path)?;
    file.changeset
        .into_iter()
        .enumerate()
        .map(|(index, raw)| {
            into_changeset(raw, options).map_err(|reason| DescriptorError::InvalidChangeSet {
                path: path.to_path_buf(),
                index,
                reason,
            })
        })
        .collect()
}

fn into_changeset(raw: RawChangeSet, options: &LoadOptions) -> Result<ChangeSet, String> {
    let id = ChangeSetId::new(raw.id).map_err(|e| e.to_string())?;
    if let Some(position) = raw.operation.iter().position(|op| !op.is_table()) {
        return Err(format!("operation #{position} of {id} must be a table"));
    }

    let operations = raw
        .operation
        .iter()
        .enumerate()
        .map(|(position, op)| {
            toml_to_json(op)
                .map(Operation::new)
                .map_err(|reason| format!("operation #{position} of {id}: {reason}"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ChangeSet::new(id, operations)
        .with_author(Author::new(raw.author.unwrap_or_default()))
        .with_contexts(raw.context.map(RawContext::into_tags).unwrap_or_default())
        .with_fail_on_error(raw.fail_on_error.unwrap_or(options.default_fail_on_error)))
}

/// Convert a TOML value to JSON. Datetimes become their RFC 3339 text.
fn toml_to_json(value: &toml::Value) -> Result<Value, String> {
    match value {
        toml::Value::String(s) => Ok(Value::String(s.clone())),
        toml::Value::Integer(i) => Ok(Value::Number((*i).into())),
        toml::Value::Float(f) => Number::from_f64(*f)
            .map(Value::Number)
            .ok_or_else(|| format!("invalid float: {f}")),
        toml::Value::Boolean(b) => Ok(Value::Bool(*b)),
        toml::Value::Datetime(dt) => Ok(Value::String(dt.to_string())),
        toml::Value::Array(items) => items
            .iter()
            .map(toml_to_json)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        toml::Value::Table(table) => table
            .iter()
            .map(|(key, value)| Ok((key.clone(), toml_to_json(value)?)))
            .collect::<Result<Map<_, _>, String>>()
            .map(Value::Object),
    }
}

fn read_toml<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, DescriptorError> {
    let contents = fs::read_to_string(path).map_err(|source| DescriptorError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| DescriptorError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
