//! End-to-end runs over fixture changelogs against SQLite files.

use crate::common::{TestDb, load};
use ferry_engine::{ChangeSetOutcome, Ledger, SkipReason};
use ferry_store::{Database, Filter};

#[test]
fn basic_changelog_applies_everything_in_order() {
    let db = TestDb::new();
    let report = db.run(&load("basic"), None).unwrap();

    assert_eq!(report.applied(), 3);
    assert!(report.ledger_created());
    assert_eq!(
        db.ledger_ids(),
        ["create-organizations", "add-founded", "create-users"]
    );
    assert_eq!(db.count("organizations"), 3);
    assert_eq!(db.count("users"), 2);

    let founded = db
        .open()
        .find("organizations", &Filter::eq("founded", 2007))
        .unwrap();
    assert_eq!(founded.len(), 1);
    assert_eq!(founded[0]["name"], "10gen");
}

#[test]
fn second_run_leaves_the_ledger_unchanged() {
    let db = TestDb::new();
    let changelog = load("basic");

    db.run(&changelog, None).unwrap();
    let after_first = Ledger.entries(&db.open()).unwrap();

    let report = db.run(&changelog, None).unwrap();
    let after_second = Ledger.entries(&db.open()).unwrap();

    assert_eq!(report.applied(), 0);
    assert_eq!(report.skipped(), 3);
    assert!(!report.ledger_created());
    assert!(report.results().iter().all(|result| matches!(
        result.outcome,
        ChangeSetOutcome::Skipped(SkipReason::AlreadyApplied)
    )));
    assert_eq!(after_first, after_second);
    assert_eq!(db.count("organizations"), 3);
    assert_eq!(db.count("users"), 2);
}

#[test]
fn empty_changelogs_only_initialize_the_ledger() {
    for name in ["empty_changelog", "no_changefiles", "empty_changefile"] {
        let db = TestDb::new();
        let changelog = load(name);
        assert!(changelog.is_empty(), "{name}");

        let report = db.run(&changelog, None).unwrap();
        assert!(report.results().is_empty(), "{name}");
        assert_eq!(db.ledger_documents(), 1, "{name}");
        assert!(db.ledger_ids().is_empty(), "{name}");
    }
}

#[test]
fn empty_run_twice_keeps_a_single_marker() {
    let db = TestDb::new();
    let changelog = load("empty_changelog");

    db.run(&changelog, None).unwrap();
    db.run(&changelog, None).unwrap();

    assert_eq!(db.ledger_documents(), 1);
}

#[test]
fn new_changesets_apply_on_top_of_an_existing_ledger() {
    let db = TestDb::new();
    db.run(&load("fail"), None).unwrap();

    let report = db.run(&load("basic"), None).unwrap();

    assert_eq!(report.applied(), 2);
    assert_eq!(report.skipped(), 1);
    assert!(matches!(
        report.outcome("create-users"),
        Some(ChangeSetOutcome::Skipped(SkipReason::AlreadyApplied))
    ));
    assert_eq!(
        db.ledger_ids(),
        [
            "create-users",
            "seed-users",
            "create-organizations",
            "add-founded",
        ]
    );
}
