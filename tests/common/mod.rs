//! Shared test utilities and fixtures
//!
//! Changelog fixtures live in `tests/fixtures/<name>/master.toml`; databases
//! are SQLite files in a temporary directory so reopening exercises real
//! persistence.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use ferry_descriptor::LoadOptions;
use ferry_engine::{Executor, ExecutorOptions, Ledger, MigrationError, RunReport};
use ferry_store::{Database, Filter, SqliteDatabase};
use ferry_types::{ChangeLog, RunContext};
use tempfile::TempDir;

pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../tests/fixtures")
        .join(name)
        .join("master.toml")
}

pub fn load(name: &str) -> ChangeLog {
    ferry_descriptor::load(fixture(name), &LoadOptions::default())
        .unwrap_or_else(|err| panic!("fixture {name} failed to load: {err}"))
}

/// A database file that outlives individual connections.
pub struct TestDb {
    _dir: TempDir,
    path: PathBuf,
}

impl TestDb {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ferry.sqlite");
        Self { _dir: dir, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fresh connection, as a new process would open.
    pub fn open(&self) -> SqliteDatabase {
        SqliteDatabase::open(&self.path).unwrap()
    }

    pub fn run(
        &self,
        changelog: &ChangeLog,
        context: Option<&str>,
    ) -> Result<RunReport, MigrationError> {
        let mut db = self.open();
        Executor::new(
            &mut db,
            ExecutorOptions::with_context(RunContext::from_optional(context)),
        )
        .run(changelog)
    }

    pub fn count(&self, collection: &str) -> u64 {
        self.open().count(collection, &Filter::all()).unwrap()
    }

    pub fn ledger_ids(&self) -> Vec<String> {
        Ledger
            .entries(&self.open())
            .unwrap()
            .into_iter()
            .map(|entry| entry.id.to_string())
            .collect()
    }

    pub fn ledger_documents(&self) -> u64 {
        self.count(ferry_engine::LEDGER_COLLECTION)
    }
}
