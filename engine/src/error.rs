use thiserror::Error;

use ferry_store::StoreError;
use ferry_types::ChangeSetId;

use crate::ledger::LedgerError;
use crate::validator::ValidationError;

/// Why a run stopped.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// The changelog was rejected before anything touched the database.
    #[error("changelog validation failed")]
    Validation(#[from] ValidationError),
    /// The ledger could not be created or accessed.
    #[error("ledger unavailable")]
    Initialization(#[from] LedgerError),
    /// The changeset was applied, but its id was already recorded by the
    /// time the entry was written.
    #[error("changeset {id} was recorded by another run")]
    Conflict { id: ChangeSetId },
    /// A changeset marked fail-on-error did not complete.
    #[error("changeset {id} failed")]
    Operation {
        id: ChangeSetId,
        #[source]
        source: StoreError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationErrorKind {
    Validation,
    Initialization,
    Conflict,
    Operation,
}

impl MigrationError {
    /// Map a failure to write a ledger entry. A duplicate id is a conflict
    /// with another runner; anything else means the ledger is unusable.
    #[must_use]
    pub fn from_record(error: LedgerError) -> Self {
        match error {
            LedgerError::AlreadyRecorded { id } => Self::Conflict { id },
            other => Self::Initialization(other),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> MigrationErrorKind {
        match self {
            Self::Validation(_) => MigrationErrorKind::Validation,
            Self::Initialization(_) => MigrationErrorKind::Initialization,
            Self::Conflict { .. } => MigrationErrorKind::Conflict,
            Self::Operation { .. } => MigrationErrorKind::Operation,
        }
    }

    /// Id of the changeset that aborted the run, if any.
    #[must_use]
    pub fn changeset_id(&self) -> Option<&ChangeSetId> {
        match self {
            Self::Operation { id, .. } | Self::Conflict { id } => Some(id),
            _ => None,
        }
    }

    #[must_use]
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            Self::Operation { source, .. } => Some(source),
            Self::Initialization(
                LedgerError::Initialize { source }
                | LedgerError::Lookup { source, .. }
                | LedgerError::Record { source, .. }
                | LedgerError::Read { source },
            ) => Some(source),
            _ => None,
        }
    }
}
