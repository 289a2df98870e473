//! Document database access for Ferry.
//!
//! The engine talks to the target database only through the [`Database`]
//! trait. Two drivers ship with the workspace:
//!
//! ```text
//! Database (trait)
//! ├── MemoryDatabase  (BTreeMap of collections, tests and dry runs)
//! └── SqliteDatabase  (collections + JSON documents in SQLite)
//! ```
//!
//! Changeset operations arrive as opaque JSON command documents and are
//! interpreted by [`Command::parse`] inside each driver's `run_command`.

mod command;
mod error;
mod filter;
mod memory;
mod sqlite;

pub use command::{Command, CommandReply};
pub use error::{CommandError, StoreError};
pub use filter::Filter;
pub use memory::MemoryDatabase;
pub use sqlite::SqliteDatabase;

use serde_json::{Map, Value};

/// A stored document: a JSON object.
pub type Document = Map<String, Value>;

/// Operations the migration engine needs from a document database.
///
/// Collections are created implicitly by `insert`, like in document stores;
/// `create_collection` exists so the ledger can reserve its collection up front.
pub trait Database {
    /// Identity of the target database, used in logs.
    fn name(&self) -> &str;

    fn collection_exists(&self, collection: &str) -> Result<bool, StoreError>;

    /// Create `collection`. Creating an existing collection is a no-op.
    fn create_collection(&mut self, collection: &str) -> Result<(), StoreError>;

    fn insert(&mut self, collection: &str, document: Document) -> Result<(), StoreError>;

    /// Documents matching `filter`, in insertion order. A missing collection yields none.
    fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError>;

    fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        Ok(self.find(collection, filter)?.len() as u64)
    }

    /// Execute one changeset operation.
    ///
    /// Command failures surface as [`StoreError::Command`], distinct from
    /// storage-level failures.
    fn run_command(&mut self, command: &Value) -> Result<CommandReply, StoreError>;
}
