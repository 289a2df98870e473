//! Ledger - persistent record of applied changesets.
//!
//! The ledger lives in the reserved [`LEDGER_COLLECTION`] of the target
//! database, next to the application data it describes. It holds one
//! configuration marker, written when the collection is first initialized,
//! plus one entry per successfully applied changeset.
//!
//! # Key Invariant
//!
//! **An entry is written only after every operation of its changeset has
//! succeeded, and is never updated or removed afterwards.**
//!
//! The ledger holds no connection of its own; every call borrows the
//! database, so the executor remains the only party driving the session.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use ferry_store::{Database, Document, Filter, StoreError};
use ferry_types::{Author, ChangeSet, ChangeSetId};

/// Reserved collection name. Never used for application data.
pub const LEDGER_COLLECTION: &str = "ferry_ledger";

/// Format version written into the marker document.
pub const LEDGER_VERSION: u64 = 1;

const MARKER_TYPE: &str = "configuration";
const ENTRY_TYPE: &str = "changeset";

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("failed to initialize ledger collection {LEDGER_COLLECTION}")]
    Initialize {
        #[source]
        source: StoreError,
    },
    #[error("failed to look up changeset {id} in the ledger")]
    Lookup {
        id: ChangeSetId,
        #[source]
        source: StoreError,
    },
    #[error("failed to record changeset {id} in the ledger")]
    Record {
        id: ChangeSetId,
        #[source]
        source: StoreError,
    },
    #[error("changeset {id} is already recorded in the ledger")]
    AlreadyRecorded { id: ChangeSetId },
    #[error("failed to read the ledger")]
    Read {
        #[source]
        source: StoreError,
    },
    #[error("malformed ledger entry: {reason}")]
    Malformed { reason: String },
}

/// One applied changeset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub id: ChangeSetId,
    pub author: Author,
    pub origin: PathBuf,
    pub applied_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Entry for `changeset`, stamped with the current time.
    #[must_use]
    pub fn applied_now(changeset: &ChangeSet) -> Self {
        Self {
            id: changeset.id().clone(),
            author: changeset.author().clone(),
            origin: changeset.origin().to_path_buf(),
            applied_at: Utc::now(),
        }
    }

    fn to_document(&self) -> Document {
        let mut document = Document::new();
        document.insert("type".into(), ENTRY_TYPE.into());
        document.insert("id".into(), self.id.as_str().into());
        document.insert("author".into(), self.author.as_str().into());
        document.insert("file".into(), self.origin.to_string_lossy().into());
        document.insert("applied_at".into(), self.applied_at.to_rfc3339().into());
        document
    }

    fn from_document(document: &Document) -> Result<Self, LedgerError> {
        let text = |field: &str| document.get(field).and_then(Value::as_str);
        let malformed = |reason: String| LedgerError::Malformed { reason };

        let id = text("id")
            .ok_or_else(|| malformed("entry without id".to_owned()))
            .and_then(|raw| ChangeSetId::new(raw).map_err(|err| malformed(err.to_string())))?;
        let applied_at = text("applied_at")
            .ok_or_else(|| malformed(format!("entry {id} without applied_at")))
            .and_then(|raw| {
                DateTime::parse_from_rfc3339(raw)
                    .map(|at| at.with_timezone(&Utc))
                    .map_err(|err| malformed(format!("entry {id}: {err}")))
            })?;

        Ok(Self {
            author: Author::new(text("author").unwrap_or_default()),
            origin: PathBuf::from(text("file").unwrap_or_default()),
            id,
            applied_at,
        })
    }
}

/// Handle on the reserved ledger collection.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ledger;

impl Ledger {
    #[must_use]
    pub const fn collection(self) -> &'static str {
        LEDGER_COLLECTION
    }

    /// Create the collection and its marker if absent.
    ///
    /// Returns `true` when the marker was written by this call.
    pub fn ensure_initialized<D: Database + ?Sized>(
        self,
        db: &mut D,
    ) -> Result<bool, LedgerError> {
        let initialize = |source| LedgerError::Initialize { source };

        if !db.collection_exists(LEDGER_COLLECTION).map_err(initialize)? {
            db.create_collection(LEDGER_COLLECTION).map_err(initialize)?;
        }
        if db
            .count(LEDGER_COLLECTION, &marker_filter())
            .map_err(initialize)?
            > 0
        {
            return Ok(false);
        }

        let mut marker = Document::new();
        marker.insert("type".into(), MARKER_TYPE.into());
        marker.insert("ledger_version".into(), LEDGER_VERSION.into());
        marker.insert("created_at".into(), Utc::now().to_rfc3339().into());
        db.insert(LEDGER_COLLECTION, marker).map_err(initialize)?;
        tracing::info!(
            database = %db.name(),
            collection = LEDGER_COLLECTION,
            "Ledger initialized"
        );
        Ok(true)
    }

    pub fn contains<D: Database + ?Sized>(
        self,
        db: &D,
        id: &ChangeSetId,
    ) -> Result<bool, LedgerError> {
        db.count(LEDGER_COLLECTION, &entry_filter(id))
            .map(|count| count > 0)
            .map_err(|source| LedgerError::Lookup {
                id: id.clone(),
                source,
            })
    }

    /// Append `entry`. Refuses an id that is already recorded.
    pub fn record<D: Database + ?Sized>(
        self,
        db: &mut D,
        entry: &LedgerEntry,
    ) -> Result<(), LedgerError> {
        if self.contains(&*db, &entry.id)? {
            return Err(LedgerError::AlreadyRecorded {
                id: entry.id.clone(),
            });
        }
        db.insert(LEDGER_COLLECTION, entry.to_document())
            .map_err(|source| LedgerError::Record {
                id: entry.id.clone(),
                source,
            })
    }

    /// Number of changeset entries; the marker is not counted.
    pub fn count<D: Database + ?Sized>(self, db: &D) -> Result<u64, LedgerError> {
        db.count(LEDGER_COLLECTION, &Filter::eq("type", ENTRY_TYPE))
            .map_err(|source| LedgerError::Read { source })
    }

    /// All changeset entries in the order they were recorded.
    pub fn entries<D: Database + ?Sized>(
        self,
        db: &D,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        db.find(LEDGER_COLLECTION, &Filter::eq("type", ENTRY_TYPE))
            .map_err(|source| LedgerError::Read { source })?
            .iter()
            .map(LedgerEntry::from_document)
            .collect()
    }

    pub fn is_initialized<D: Database + ?Sized>(self, db: &D) -> Result<bool, LedgerError> {
        let read = |source| LedgerError::Read { source };
        if !db.collection_exists(LEDGER_COLLECTION).map_err(read)? {
            return Ok(false);
        }
        Ok(db
            .count(LEDGER_COLLECTION, &marker_filter())
            .map_err(read)?
            > 0)
    }
}

fn marker_filter() -> Filter {
    Filter::eq("type", MARKER_TYPE)
}

fn entry_filter(id: &ChangeSetId) -> Filter {
    Filter::eq("type", ENTRY_TYPE).and("id", id.as_str())
}
