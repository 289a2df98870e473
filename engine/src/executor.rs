//! Executor - applies a changelog against one database.
//!
//! # State machine
//!
//! ```text
//! Pending ─► Validating ─► Init ─► Iterating ─► Done
//!                │           │         │
//!                └───────────┴─────────┴──► Aborted
//! ```
//!
//! Validation happens before the ledger is touched, so a rejected changelog
//! leaves the database exactly as it was.

use ferry_store::{Database, StoreError};
use ferry_types::{ChangeLog, ChangeSet, ChangeSetId, RunContext};

use crate::context_filter::ContextFilter;
use crate::error::MigrationError;
use crate::ledger::{Ledger, LedgerEntry};
use crate::validator::DuplicateIdValidator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Pending,
    Validating,
    Init,
    Iterating,
    Done,
    Aborted,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutorOptions {
    /// Run context. `None` runs untagged changesets only.
    pub context: Option<RunContext>,
}

impl ExecutorOptions {
    #[must_use]
    pub fn with_context(context: Option<RunContext>) -> Self {
        Self { context }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    ContextMismatch,
    AlreadyApplied,
}

#[derive(Debug)]
pub enum ChangeSetOutcome {
    Applied,
    Skipped(SkipReason),
    /// An operation failed on a changeset that does not fail the run.
    /// Nothing was recorded, so the next run retries it.
    Failed { error: StoreError },
}

impl ChangeSetOutcome {
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

#[derive(Debug)]
pub struct ChangeSetResult {
    pub id: ChangeSetId,
    pub outcome: ChangeSetOutcome,
}

/// Outcome of one completed run, in declared order.
#[derive(Debug, Default)]
pub struct RunReport {
    results: Vec<ChangeSetResult>,
    ledger_created: bool,
}

impl RunReport {
    #[must_use]
    pub fn results(&self) -> &[ChangeSetResult] {
        &self.results
    }

    /// Whether this run wrote the ledger marker.
    #[must_use]
    pub const fn ledger_created(&self) -> bool {
        self.ledger_created
    }

    #[must_use]
    pub fn applied(&self) -> usize {
        self.count(|outcome| matches!(outcome, ChangeSetOutcome::Applied))
    }

    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, ChangeSetOutcome::Skipped(_)))
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, ChangeSetOutcome::Failed { .. }))
    }

    #[must_use]
    pub fn outcome(&self, id: &str) -> Option<&ChangeSetOutcome> {
        self.results
            .iter()
            .find(|result| result.id.as_str() == id)
            .map(|result| &result.outcome)
    }

    /// Ids of applied changesets, in the order they were applied.
    pub fn applied_ids(&self) -> impl Iterator<Item = &ChangeSetId> {
        self.results
            .iter()
            .filter(|result| result.outcome.is_applied())
            .map(|result| &result.id)
    }

    fn count(&self, pred: impl Fn(&ChangeSetOutcome) -> bool) -> usize {
        self.results
            .iter()
            .filter(|result| pred(&result.outcome))
            .count()
    }

    fn push(&mut self, id: &ChangeSetId, outcome: ChangeSetOutcome) {
        self.results.push(ChangeSetResult {
            id: id.clone(),
            outcome,
        });
    }
}

/// Drives one run over a borrowed database session.
pub struct Executor<'db, D: Database + ?Sized> {
    db: &'db mut D,
    filter: ContextFilter,
    ledger: Ledger,
    state: RunState,
}

impl<'db, D: Database + ?Sized> Executor<'db, D> {
    pub fn new(db: &'db mut D, options: ExecutorOptions) -> Self {
        Self {
            db,
            filter: ContextFilter::new(options.context),
            ledger: Ledger,
            state: RunState::Pending,
        }
    }

    #[must_use]
    pub const fn state(&self) -> RunState {
        self.state
    }

    /// Apply every eligible, not yet recorded changeset in declared order.
    pub fn run(&mut self, changelog: &ChangeLog) -> Result<RunReport, MigrationError> {
        let span = tracing::info_span!(
            "migration_run",
            database = %self.db.name(),
            context = self.filter.context().map(RunContext::as_str),
        );
        let _enter = span.enter();

        let result = self.run_inner(changelog);
        self.state = match &result {
            Ok(report) => {
                tracing::info!(
                    applied = report.applied(),
                    skipped = report.skipped(),
                    failed = report.failed(),
                    "Migration run finished"
                );
                RunState::Done
            }
            Err(err) => {
                tracing::error!(error = %err, kind = ?err.kind(), "Migration run aborted");
                RunState::Aborted
            }
        };
        result
    }

    fn run_inner(&mut self, changelog: &ChangeLog) -> Result<RunReport, MigrationError> {
        self.state = RunState::Validating;
        DuplicateIdValidator::validate(changelog)?;

        self.state = RunState::Init;
        let mut report = RunReport {
            ledger_created: self.ledger.ensure_initialized(&mut *self.db)?,
            ..RunReport::default()
        };

        self.state = RunState::Iterating;
        tracing::info!(changesets = changelog.len(), "Applying changelog");
        for changeset in changelog {
            let outcome = self.step(changeset)?;
            report.push(changeset.id(), outcome);
        }
        Ok(report)
    }

    fn step(&mut self, changeset: &ChangeSet) -> Result<ChangeSetOutcome, MigrationError> {
        let id = changeset.id();

        if !self.filter.is_eligible(changeset.contexts()) {
            tracing::debug!(
                %id,
                contexts = %changeset.contexts(),
                "Skipping changeset outside run context"
            );
            return Ok(ChangeSetOutcome::Skipped(SkipReason::ContextMismatch));
        }
        if self.ledger.contains(&*self.db, id)? {
            tracing::debug!(%id, "Skipping changeset already in ledger");
            return Ok(ChangeSetOutcome::Skipped(SkipReason::AlreadyApplied));
        }

        if let Err(error) = self.apply(changeset) {
            if changeset.fail_on_error() {
                return Err(MigrationError::Operation {
                    id: id.clone(),
                    source: error,
                });
            }
            tracing::warn!(%id, %error, "Changeset failed; continuing");
            return Ok(ChangeSetOutcome::Failed { error });
        }

        self.ledger
            .record(&mut *self.db, &LedgerEntry::applied_now(changeset))
            .map_err(MigrationError::from_record)?;
        tracing::info!(
            %id,
            author = %changeset.author(),
            origin = %changeset.origin().display(),
            "Applied changeset"
        );
        Ok(ChangeSetOutcome::Applied)
    }

    fn apply(&mut self, changeset: &ChangeSet) -> Result<(), StoreError> {
        for (index, operation) in changeset.operations().iter().enumerate() {
            let reply = self.db.run_command(operation.as_value())?;
            tracing::trace!(
                id = %changeset.id(),
                index,
                affected = reply.affected,
                "Operation executed"
            );
        }
        Ok(())
    }
}
