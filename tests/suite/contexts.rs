use crate::common::{TestDb, load};

#[test]
fn no_context_runs_only_untagged_changesets() {
    let db = TestDb::new();
    let report = db.run(&load("contexts"), None).unwrap();

    assert_eq!(report.applied(), 1);
    assert_eq!(report.skipped(), 3);
    assert_eq!(db.count("car"), 1);
    assert_eq!(db.count("user"), 0);
    assert_eq!(db.count("organization"), 0);
    assert_eq!(db.count("house"), 0);
}

#[test]
fn users_context_adds_changesets_tagged_users() {
    let db = TestDb::new();
    let report = db.run(&load("contexts"), Some("users")).unwrap();

    assert_eq!(report.applied(), 3);
    assert_eq!(db.count("car"), 1);
    assert_eq!(db.count("user"), 1);
    assert_eq!(db.count("organization"), 0);
    assert_eq!(db.count("house"), 1);
    assert_eq!(db.ledger_ids(), ["cars", "users", "houses"]);
}

#[test]
fn organizations_context_adds_changesets_tagged_organizations() {
    let db = TestDb::new();
    db.run(&load("contexts"), Some("organizations")).unwrap();

    assert_eq!(db.count("user"), 0);
    assert_eq!(db.count("organization"), 1);
    assert_eq!(db.count("house"), 1);
}

#[test]
fn skipped_by_context_runs_later_under_a_matching_context() {
    let db = TestDb::new();
    let changelog = load("contexts");

    db.run(&changelog, None).unwrap();
    let report = db.run(&changelog, Some("users")).unwrap();

    assert_eq!(report.applied(), 2);
    assert_eq!(db.count("car"), 1);
    assert_eq!(db.count("user"), 1);
}

#[test]
fn blank_context_is_no_context() {
    let db = TestDb::new();
    db.run(&load("contexts"), Some("   ")).unwrap();
    assert_eq!(db.ledger_ids(), ["cars"]);
}

#[test]
fn repeated_runs_under_one_context_apply_once() {
    let db = TestDb::new();
    let changelog = load("contexts");

    db.run(&changelog, Some("organizations")).unwrap();
    let report = db.run(&changelog, Some("organizations")).unwrap();

    assert_eq!(report.applied(), 0);
    assert_eq!(db.count("car"), 1);
    assert_eq!(db.count("organization"), 1);
    assert_eq!(db.ledger_ids(), ["cars", "organizations", "houses"]);
}
