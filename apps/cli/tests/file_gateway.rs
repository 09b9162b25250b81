//! Integration tests for the local row-file gateway.

use quizdrill::gateway::FileGateway;
use quizdrill_core::gateway::{PersistenceGateway, ProgressRecord, RowHandle};
use quizdrill_core::ledger::Ledger;
use quizdrill_core::types::Submission;
use std::fs;
use std::path::PathBuf;

struct TempFile(PathBuf);

impl TempFile {
    fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "quizdrill-test-{}-{}.json",
            std::process::id(),
            name
        ));
        let _ = fs::remove_file(&path);
        Self(path)
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.0);
    }
}

fn sample_record() -> ProgressRecord {
    let mut ledger = Ledger::new();
    ledger.apply_result(3, Submission::Single("B. no".into()), false);
    ledger.apply_result(
        7,
        Submission::Multiple(vec!["A. x".into(), "C. z".into()]),
        false,
    );
    ledger.apply_result(5, Submission::Single("A. yes".into()), true);
    ProgressRecord::new(ledger, Some(chrono::Utc::now()))
}

#[test]
fn missing_file_means_no_rows() {
    let tmp = TempFile::new("missing");
    let mut gateway = FileGateway::new(tmp.0.clone());
    assert!(gateway.find("ann").unwrap().is_none());
}

#[test]
fn write_find_read_round_trip() {
    let tmp = TempFile::new("roundtrip");
    let mut gateway = FileGateway::new(tmp.0.clone());

    let record = sample_record();
    let handle = gateway.write("ann", &record, None).unwrap();

    let found = gateway.find("ann").unwrap().expect("row was created");
    assert_eq!(found, handle);

    let loaded = gateway.read(&found).unwrap();
    assert_eq!(loaded.ledger, record.ledger);
    assert!(loaded.updated_at.is_some());
}

#[test]
fn update_by_handle_replaces_the_row() {
    let tmp = TempFile::new("update");
    let mut gateway = FileGateway::new(tmp.0.clone());

    let handle = gateway.write("ann", &sample_record(), None).unwrap();
    let empty = ProgressRecord::new(Ledger::new(), None);
    let updated = gateway.write("ann", &empty, Some(&handle)).unwrap();
    assert_eq!(updated, handle);

    // still a single row, now holding the empty ledger
    assert_eq!(gateway.find("ann").unwrap(), Some(handle));
    assert!(gateway.read(&handle).unwrap().ledger.is_empty());
}

#[test]
fn rows_are_per_user() {
    let tmp = TempFile::new("per-user");
    let mut gateway = FileGateway::new(tmp.0.clone());

    let ann = gateway.write("ann", &sample_record(), None).unwrap();
    let bob = gateway.write("bob", &ProgressRecord::new(Ledger::new(), None), None).unwrap();
    assert_ne!(ann, bob);

    assert_eq!(gateway.find("ann").unwrap(), Some(ann));
    assert_eq!(gateway.find("bob").unwrap(), Some(bob));
    assert!(gateway.read(&bob).unwrap().ledger.is_empty());
    assert!(!gateway.read(&ann).unwrap().ledger.is_empty());
}

#[test]
fn stale_handle_is_an_error() {
    let tmp = TempFile::new("stale");
    let mut gateway = FileGateway::new(tmp.0.clone());
    assert!(gateway.read(&RowHandle(4)).is_err());
}
