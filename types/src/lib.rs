//! Core domain types for Ferry.
//!
//! This crate contains pure value types with no IO, no async, and minimal dependencies:
//! changeset identity, context tags, and the ordered changelog assembled from
//! descriptor sources. Everything here can be used from any layer of the workspace.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod changelog;
mod changeset;
mod context;

pub use changelog::{ChangeLog, ChangeLogBuilder};
pub use changeset::{Author, ChangeSet, ChangeSetId, EmptyIdError, Operation};
pub use context::{ContextTags, EmptyContextError, RunContext};
