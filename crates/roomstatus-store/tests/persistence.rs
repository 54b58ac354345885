//! On-disk persistence tests for roomstatus-store.

use roomstatus_store::Store;
use tempfile::TempDir;

#[test]
fn gain_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("prefs.db");

    {
        let store = Store::open(&path).unwrap();
        store.set_preference("gain", "0.35").unwrap();
    }

    let store = Store::open(&path).unwrap();
    assert_eq!(store.get_preference("gain").unwrap().as_deref(), Some("0.35"));
}

#[test]
fn open_creates_parent_directories() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("deeper").join("prefs.db");

    let store = Store::open(&path).unwrap();
    store.set_preference("k", "v").unwrap();
    assert!(path.exists());
}
