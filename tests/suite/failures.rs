use crate::common::{TestDb, load};
use ferry_engine::{ChangeSetOutcome, MigrationErrorKind};
use ferry_store::{CommandError, Database};

#[test]
fn recoverable_failure_completes_the_run() {
    let db = TestDb::new();
    let report = db.run(&load("fail"), None).unwrap();

    assert_eq!(report.applied(), 2);
    assert_eq!(report.failed(), 1);
    match report.outcome("drop-missing") {
        Some(ChangeSetOutcome::Failed { error }) => assert!(matches!(
            error.command_error(),
            Some(CommandError::NamespaceNotFound(_))
        )),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(db.ledger_ids(), ["create-users", "seed-users"]);
    assert_eq!(db.count("users"), 1);
}

#[test]
fn recoverable_failure_is_retried_next_run() {
    let db = TestDb::new();
    let changelog = load("fail");

    db.run(&changelog, None).unwrap();
    let report = db.run(&changelog, None).unwrap();

    assert_eq!(report.applied(), 0);
    assert_eq!(report.skipped(), 2);
    assert_eq!(report.failed(), 1);
    assert!(!db.ledger_ids().iter().any(|id| id == "drop-missing"));
}

#[test]
fn fatal_failure_aborts_immediately() {
    let db = TestDb::new();
    let err = db.run(&load("fail_fail"), None).unwrap_err();

    assert_eq!(err.kind(), MigrationErrorKind::Operation);
    assert_eq!(err.changeset_id().map(|id| id.as_str()), Some("drop-missing"));
    assert!(err.store_error().is_some_and(|e| e.is_command_failure()));

    assert_eq!(db.ledger_ids(), ["create-users"]);
    assert_eq!(db.count("users"), 0);
}

#[test]
fn fatal_failure_does_not_undo_earlier_changesets() {
    let db = TestDb::new();
    let changelog = load("fail_fail");

    db.run(&changelog, None).unwrap_err();
    let err = db.run(&changelog, None).unwrap_err();

    assert_eq!(err.kind(), MigrationErrorKind::Operation);
    assert!(db.open().collection_exists("users").unwrap());
    assert_eq!(db.ledger_ids(), ["create-users"]);
}

#[test]
fn continue_on_error_default_makes_unmarked_failures_recoverable() {
    let db = TestDb::new();
    let changelog = ferry_descriptor::load(
        crate::common::fixture("fail"),
        &ferry_descriptor::LoadOptions {
            default_fail_on_error: false,
        },
    )
    .unwrap();

    assert!(changelog.iter().all(|changeset| !changeset.fail_on_error()));
    let report = db.run(&changelog, None).unwrap();
    assert_eq!(report.failed(), 1);
}
