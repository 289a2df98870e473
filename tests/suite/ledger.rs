use crate::common::{TestDb, load};
use ferry_engine::{LEDGER_COLLECTION, LEDGER_VERSION, Ledger};
use ferry_store::{Database, Filter};

#[test]
fn entries_keep_author_and_origin() {
    let db = TestDb::new();
    db.run(&load("basic"), None).unwrap();

    let entries = Ledger.entries(&db.open()).unwrap();
    let users = entries
        .iter()
        .find(|entry| entry.id.as_str() == "create-users")
        .unwrap();

    assert_eq!(users.author.as_str(), "mlysaght");
    assert!(users.origin.ends_with("user.toml"));
}

#[test]
fn marker_records_the_ledger_version() {
    let db = TestDb::new();
    db.run(&load("empty_changelog"), None).unwrap();

    let markers = db
        .open()
        .find(LEDGER_COLLECTION, &Filter::eq("type", "configuration"))
        .unwrap();
    assert_eq!(markers.len(), 1);
    assert_eq!(markers[0]["ledger_version"], LEDGER_VERSION);
}

#[test]
fn ledger_survives_reopening_the_database() {
    let db = TestDb::new();
    db.run(&load("basic"), None).unwrap();

    let conn = db.open();
    assert!(Ledger.is_initialized(&conn).unwrap());
    assert_eq!(Ledger.count(&conn).unwrap(), 3);
}
