use crate::common::{TestDb, load};
use ferry_engine::{LEDGER_COLLECTION, MigrationError, MigrationErrorKind, ValidationError};
use ferry_store::Database;

#[test]
fn duplicate_ids_fail_before_any_mutation() {
    let db = TestDb::new();
    let err = db.run(&load("duplicate_ids"), None).unwrap_err();

    assert_eq!(err.kind(), MigrationErrorKind::Validation);
    match err {
        MigrationError::Validation(ValidationError::DuplicateIds { ids }) => {
            assert_eq!(ids.len(), 1);
            assert_eq!(ids[0].as_str(), "create-users");
        }
        other => panic!("unexpected error: {other}"),
    }

    let conn = db.open();
    assert!(!conn.collection_exists(LEDGER_COLLECTION).unwrap());
    assert!(!conn.collection_exists("users").unwrap());
}

#[test]
fn loader_keeps_duplicates_for_the_validator() {
    let changelog = load("duplicate_ids");
    assert_eq!(changelog.len(), 2);
    assert_eq!(changelog.sources().len(), 2);
}
