use std::collections::BTreeMap;

use serde_json::Value;

use crate::command::{Command, CommandReply};
use crate::error::{CommandError, StoreError};
use crate::{Database, Document, Filter};

/// Volatile database backed by ordered maps.
///
/// Used by tests and by dry runs, where the target database must stay untouched.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    name: String,
    collections: BTreeMap<String, Vec<Document>>,
}

impl MemoryDatabase {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collections: BTreeMap::new(),
        }
    }

    /// Names of all collections, sorted.
    #[must_use]
    pub fn collection_names(&self) -> Vec<String> {
        self.collections.keys().cloned().collect()
    }

    fn apply(&mut self, command: Command) -> Result<CommandReply, CommandError> {
        match command {
            Command::Create { collection } => {
                if self.collections.contains_key(&collection) {
                    return Err(CommandError::NamespaceExists(collection));
                }
                self.collections.insert(collection, Vec::new());
                Ok(CommandReply::affected(1))
            }
            Command::Drop { collection } => {
                if self.collections.remove(&collection).is_none() {
                    return Err(CommandError::NamespaceNotFound(collection));
                }
                Ok(CommandReply::affected(1))
            }
            Command::Insert {
                collection,
                documents,
            } => {
                let affected = documents.len() as u64;
                self.collections
                    .entry(collection)
                    .or_default()
                    .extend(documents);
                Ok(CommandReply::affected(affected))
            }
            Command::Update {
                collection,
                filter,
                set,
            } => {
                let mut affected = 0;
                if let Some(documents) = self.collections.get_mut(&collection) {
                    for document in documents.iter_mut().filter(|d| filter.matches(d)) {
                        for (field, value) in &set {
                            document.insert(field.clone(), value.clone());
                        }
                        affected += 1;
                    }
                }
                Ok(CommandReply::affected(affected))
            }
            Command::Delete { collection, filter } => {
                let Some(documents) = self.collections.get_mut(&collection) else {
                    return Ok(CommandReply::default());
                };
                let before = documents.len();
                documents.retain(|d| !filter.matches(d));
                Ok(CommandReply::affected((before - documents.len()) as u64))
            }
        }
    }
}

impl Database for MemoryDatabase {
    fn name(&self) -> &str {
        &self.name
    }

    fn collection_exists(&self, collection: &str) -> Result<bool, StoreError> {
        Ok(self.collections.contains_key(collection))
    }

    fn create_collection(&mut self, collection: &str) -> Result<(), StoreError> {
        self.collections.entry(collection.to_owned()).or_default();
        Ok(())
    }

    fn insert(&mut self, collection: &str, document: Document) -> Result<(), StoreError> {
        self.collections
            .entry(collection.to_owned())
            .or_default()
            .push(document);
        Ok(())
    }

    fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        Ok(self
            .collections
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|d| filter.matches(d))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn run_command(&mut self, command: &Value) -> Result<CommandReply, StoreError> {
        let command = Command::parse(command)?;
        self.apply(command).map_err(StoreError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryDatabase;
    use crate::{CommandError, Database, Filter, StoreError};
    use serde_json::json;

    #[test]
    fn insert_creates_collection_implicitly() {
        let mut db = MemoryDatabase::new("test");
        assert!(!db.collection_exists("user").unwrap());

        let reply = db
            .run_command(&json!({"insert": "user", "documents": [{"n": 1}, {"n": 2}]}))
            .unwrap();

        assert_eq!(reply.affected, 2);
        assert!(db.collection_exists("user").unwrap());
        assert_eq!(db.count("user", &Filter::all()).unwrap(), 2);
    }

    #[test]
    fn create_existing_collection_fails() {
        let mut db = MemoryDatabase::new("test");
        db.run_command(&json!({"create": "user"})).unwrap();

        let err = db.run_command(&json!({"create": "user"})).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Command(CommandError::NamespaceExists(ref name)) if name == "user"
        ));
    }

    #[test]
    fn drop_missing_collection_fails() {
        let mut db = MemoryDatabase::new("test");
        let err = db.run_command(&json!({"drop": "ghost"})).unwrap_err();
        assert!(err.is_command_failure());
    }

    #[test]
    fn update_and_delete_respect_filter() {
        let mut db = MemoryDatabase::new("test");
        db.run_command(&json!({
            "insert": "user",
            "documents": [{"name": "ada", "role": "admin"}, {"name": "bob", "role": "dev"}]
        }))
        .unwrap();

        let updated = db
            .run_command(&json!({
                "update": "user",
                "filter": {"role": "dev"},
                "set": {"active": true}
            }))
            .unwrap();
        assert_eq!(updated.affected, 1);
        assert_eq!(db.count("user", &Filter::eq("active", true)).unwrap(), 1);

        let deleted = db
            .run_command(&json!({"delete": "user", "filter": {"name": "ada"}}))
            .unwrap();
        assert_eq!(deleted.affected, 1);
        assert_eq!(db.count("user", &Filter::all()).unwrap(), 1);
    }

    #[test]
    fn create_collection_is_idempotent() {
        let mut db = MemoryDatabase::new("test");
        db.create_collection("ledger").unwrap();
        db.insert("ledger", serde_json::Map::new()).unwrap();
        db.create_collection("ledger").unwrap();
        assert_eq!(db.count("ledger", &Filter::all()).unwrap(), 1);
        assert_eq!(db.collection_names(), vec!["ledger".to_owned()]);
    }
}
