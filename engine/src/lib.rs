//! Changelog execution core.
//!
//! This crate provides:
//! - The ledger of applied changesets, kept in a reserved collection
//! - Pre-flight duplicate id validation
//! - Context filtering of tagged changesets
//! - The executor tying them together with a per-changeset failure policy
//!
//! # Architecture
//!
//! ```text
//! Executor<'db, D: Database>
//! ├── DuplicateIdValidator (once, before any mutation)
//! ├── Ledger               (ensure_initialized, contains, record)
//! ├── ContextFilter        (per changeset eligibility)
//! └── db: &'db mut D       (borrowed session, never owned)
//!
//! ChangeLog ──► validate ──► init ledger ──► for each ChangeSet:
//!     context gate ─► ledger lookup ─► run operations ─► record
//!                                                    └─► Failed { recoverable }
//! ```

mod context_filter;
mod error;
mod executor;
mod ledger;
mod validator;

pub use context_filter::ContextFilter;
pub use error::{MigrationError, MigrationErrorKind};
pub use executor::{
    ChangeSetOutcome, ChangeSetResult, Executor, ExecutorOptions, RunReport, RunState, SkipReason,
};
pub use ledger::{LEDGER_COLLECTION, LEDGER_VERSION, Ledger, LedgerEntry, LedgerError};
pub use validator::{DuplicateIdValidator, ValidationError};
