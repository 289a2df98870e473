//! SQLite-backed document database.
//!
//! Collections are rows in `collections`; documents are JSON text rows in
//! `documents`, ordered by an autoincrement key so reads return insertion
//! order. Every command runs inside one SQLite transaction, so a single
//! command is all-or-nothing even when it touches many documents.

use std::fs::{self, OpenOptions};
use std::path::Path;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use serde_json::Value;

use crate::command::{Command, CommandReply};
use crate::error::{CommandError, SqliteContext, StoreError};
use crate::{Database, Document, Filter};

pub struct SqliteDatabase {
    db: Connection,
    name: String,
}

impl SqliteDatabase {
    const SCHEMA: &'static str = r"
        CREATE TABLE IF NOT EXISTS collections (
            name TEXT PRIMARY KEY,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS documents (
            doc_id INTEGER PRIMARY KEY AUTOINCREMENT,
            collection TEXT NOT NULL,
            body TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_documents_collection
        ON documents(collection, doc_id);

        CREATE INDEX IF NOT EXISTS idx_documents_id
        ON documents(collection, json_extract(body, '$.id'));
    ";

    /// Open or create a database file at `path`.
    ///
    /// The database identity defaults to the file stem.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        prepare_db_file(path)?;

        let db = Connection::open(path)
            .sql_context(|| format!("Failed to open database at {}", path.display()))?;
        let name = path
            .file_stem()
            .map_or_else(|| "ferry".to_owned(), |stem| stem.to_string_lossy().into_owned());
        Self::initialize(db, name)
    }

    /// Open a volatile database (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let db = Connection::open_in_memory()
            .sql_context(|| "Failed to open in-memory database".to_owned())?;
        Self::initialize(db, "memory".to_owned())
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn initialize(db: Connection, name: String) -> Result<Self, StoreError> {
        db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=FULL;")
            .sql_context(|| "Failed to set database pragmas".to_owned())?;
        db.execute_batch(Self::SCHEMA)
            .sql_context(|| "Failed to create database schema".to_owned())?;
        Ok(Self { db, name })
    }

    /// Names of all collections, sorted.
    pub fn collection_names(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .db
            .prepare("SELECT name FROM collections ORDER BY name ASC")
            .sql_context(|| "Failed to prepare collection listing".to_owned())?;
        stmt.query_map([], |row| row.get(0))
            .sql_context(|| "Failed to list collections".to_owned())?
            .collect::<rusqlite::Result<Vec<String>>>()
            .sql_context(|| "Failed to read collection names".to_owned())
    }

    fn apply(&mut self, command: Command) -> Result<CommandReply, StoreError> {
        let tx = self
            .db
            .transaction()
            .sql_context(|| "Failed to start command transaction".to_owned())?;

        let reply = match command {
            Command::Create { collection } => {
                if exists(&tx, &collection)? {
                    return Err(CommandError::NamespaceExists(collection).into());
                }
                create(&tx, &collection)?;
                CommandReply::affected(1)
            }
            Command::Drop { collection } => {
                if !exists(&tx, &collection)? {
                    return Err(CommandError::NamespaceNotFound(collection).into());
                }
                tx.execute(
                    "DELETE FROM documents WHERE collection = ?1",
                    params![collection],
                )
                .sql_context(|| format!("Failed to drop documents of {collection}"))?;
                tx.execute("DELETE FROM collections WHERE name = ?1", params![collection])
                    .sql_context(|| format!("Failed to drop collection {collection}"))?;
                CommandReply::affected(1)
            }
            Command::Insert {
                collection,
                documents,
            } => {
                if !exists(&tx, &collection)? {
                    create(&tx, &collection)?;
                }
                for document in &documents {
                    insert(&tx, &collection, document)?;
                }
                CommandReply::affected(documents.len() as u64)
            }
            Command::Update {
                collection,
                filter,
                set,
            } => {
                let mut affected = 0;
                for (doc_id, mut document) in select(&tx, &collection, &filter)? {
                    for (field, value) in &set {
                        document.insert(field.clone(), value.clone());
                    }
                    let body = serde_json::to_string(&document)?;
                    tx.execute(
                        "UPDATE documents SET body = ?1 WHERE doc_id = ?2",
                        params![body, doc_id],
                    )
                    .sql_context(|| format!("Failed to update document {doc_id} in {collection}"))?;
                    affected += 1;
                }
                CommandReply::affected(affected)
            }
            Command::Delete { collection, filter } => {
                let mut affected = 0;
                for (doc_id, _) in select(&tx, &collection, &filter)? {
                    tx.execute("DELETE FROM documents WHERE doc_id = ?1", params![doc_id])
                        .sql_context(|| {
                            format!("Failed to delete document {doc_id} in {collection}")
                        })?;
                    affected += 1;
                }
                CommandReply::affected(affected)
            }
        };

        tx.commit()
            .sql_context(|| "Failed to commit command transaction".to_owned())?;
        Ok(reply)
    }
}

impl Database for SqliteDatabase {
    fn name(&self) -> &str {
        &self.name
    }

    fn collection_exists(&self, collection: &str) -> Result<bool, StoreError> {
        exists(&self.db, collection)
    }

    fn create_collection(&mut self, collection: &str) -> Result<(), StoreError> {
        self.db
            .execute(
                "INSERT OR IGNORE INTO collections (name, created_at) VALUES (?1, ?2)",
                params![collection, Utc::now().to_rfc3339()],
            )
            .sql_context(|| format!("Failed to create collection {collection}"))?;
        Ok(())
    }

    fn insert(&mut self, collection: &str, document: Document) -> Result<(), StoreError> {
        let tx = self
            .db
            .transaction()
            .sql_context(|| "Failed to start insert transaction".to_owned())?;
        if !exists(&tx, collection)? {
            create(&tx, collection)?;
        }
        insert(&tx, collection, &document)?;
        tx.commit()
            .sql_context(|| format!("Failed to commit insert into {collection}"))
    }

    fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        Ok(select(&self.db, collection, filter)?
            .into_iter()
            .map(|(_, document)| document)
            .collect())
    }

    fn run_command(&mut self, command: &Value) -> Result<CommandReply, StoreError> {
        let command = Command::parse(command)?;
        let verb = command.verb();
        let reply = self.apply(command)?;
        tracing::debug!(database = %self.name, verb, affected = reply.affected, "Command applied");
        Ok(reply)
    }
}

/// Field names that can be spliced into a JSON path verbatim.
fn is_plain_field(field: &str) -> bool {
    !field.is_empty()
        && field
            .bytes()
            .all(|byte| byte.is_ascii_alphanumeric() || byte == b'_')
}

fn exists(db: &Connection, collection: &str) -> Result<bool, StoreError> {
    db.query_row(
        "SELECT 1 FROM collections WHERE name = ?1",
        params![collection],
        |_| Ok(()),
    )
    .optional()
    .map(|found| found.is_some())
    .sql_context(|| format!("Failed to look up collection {collection}"))
}

fn create(db: &Connection, collection: &str) -> Result<(), StoreError> {
    db.execute(
        "INSERT INTO collections (name, created_at) VALUES (?1, ?2)",
        params![collection, Utc::now().to_rfc3339()],
    )
    .sql_context(|| format!("Failed to create collection {collection}"))?;
    Ok(())
}

fn insert(db: &Connection, collection: &str, document: &Document) -> Result<(), StoreError> {
    let body = serde_json::to_string(document)?;
    db.execute(
        "INSERT INTO documents (collection, body) VALUES (?1, ?2)",
        params![collection, body],
    )
    .sql_context(|| format!("Failed to insert document into {collection}"))?;
    Ok(())
}

/// Matching documents with their row ids, in insertion order.
///
/// String equalities on plainly named fields are narrowed in SQL first;
/// `Filter::matches` still decides every returned row.
fn select(
    db: &Connection,
    collection: &str,
    filter: &Filter,
) -> Result<Vec<(i64, Document)>, StoreError> {
    let mut sql = String::from("SELECT doc_id, body FROM documents WHERE collection = ?1");
    let mut values = vec![collection];
    for (field, expected) in filter.string_fields().filter(|(field, _)| is_plain_field(field)) {
        values.push(expected);
        sql.push_str(&format!(" AND json_extract(body, '$.{field}') = ?{}", values.len()));
    }
    sql.push_str(" ORDER BY doc_id ASC");

    let mut stmt = db
        .prepare(&sql)
        .sql_context(|| format!("Failed to prepare query on {collection}"))?;

    let rows = stmt
        .query_map(params_from_iter(values), |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })
        .sql_context(|| format!("Failed to query {collection}"))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .sql_context(|| format!("Failed to read documents of {collection}"))?;

    let mut matched = Vec::new();
    for (doc_id, body) in rows {
        let document: Document = serde_json::from_str(&body)?;
        if filter.matches(&document) {
            matched.push((doc_id, document));
        }
    }
    Ok(matched)
}

/// Create the parent directory and the database file, owner-only on Unix.
fn prepare_db_file(path: &Path) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    if path.exists() {
        return Ok(());
    }

    let mut options = OpenOptions::new();
    options.create(true).truncate(false).read(true).write(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path).map(drop).map_err(io_err)
}
