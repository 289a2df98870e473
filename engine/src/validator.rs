use std::collections::HashSet;

use thiserror::Error;

use ferry_types::{ChangeLog, ChangeSetId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("duplicate changeset ids: {}", join_ids(.ids))]
    DuplicateIds { ids: Vec<ChangeSetId> },
}

fn join_ids(ids: &[ChangeSetId]) -> String {
    ids.iter()
        .map(ChangeSetId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Structural check over a whole changelog, run before anything touches the database.
#[derive(Debug, Clone, Copy, Default)]
pub struct DuplicateIdValidator;

impl DuplicateIdValidator {
    /// Fails naming every repeated id once, in the order the repeats are found.
    pub fn validate(changelog: &ChangeLog) -> Result<(), ValidationError> {
        let mut seen: HashSet<&str> = HashSet::with_capacity(changelog.len());
        let mut reported: HashSet<&str> = HashSet::new();
        let mut duplicates = Vec::new();

        for changeset in changelog {
            let id = changeset.id();
            if !seen.insert(id.as_str()) && reported.insert(id.as_str()) {
                duplicates.push(id.clone());
            }
        }

        if duplicates.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::DuplicateIds { ids: duplicates })
        }
    }
}
