//! # Restart Round-Trips
//!
//! Close/open cycles over the page file: everything the pager committed
//! before close must read back identically after open, and the master
//! page must keep the file self-describing (signature, root, used).

use tempfile::tempdir;
use winniedb::storage::Pager;

#[test]
fn values_survive_close_and_open() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("index.db");

    let pairs: Vec<(String, String)> = (0..200)
        .map(|i| (format!("key-{:04}", i), format!("value-{:04}", i * 7)))
        .collect();

    {
        let mut pager = Pager::open(&path).unwrap();
        for (k, v) in &pairs {
            pager.set(k.as_bytes(), v.as_bytes()).unwrap();
        }
    }

    let pager = Pager::open(&path).unwrap();
    for (k, v) in &pairs {
        assert_eq!(
            pager.get(k.as_bytes()),
            Some(v.as_bytes().to_vec()),
            "{} lost across restart",
            k
        );
    }
}

#[test]
fn overwrites_survive_restart_with_last_value() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("index.db");

    {
        let mut pager = Pager::open(&path).unwrap();
        for round in 0..5u32 {
            for i in 0..40u32 {
                let key = format!("slot-{:02}", i);
                let val = format!("round-{}-{}", round, i);
                pager.set(key.as_bytes(), val.as_bytes()).unwrap();
            }
        }
    }

    let pager = Pager::open(&path).unwrap();
    for i in 0..40u32 {
        let key = format!("slot-{:02}", i);
        assert_eq!(
            pager.get(key.as_bytes()),
            Some(format!("round-4-{}", i).into_bytes())
        );
    }
}

#[test]
fn repeated_open_close_cycles_accumulate() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("index.db");

    for cycle in 0..5u32 {
        let mut pager = Pager::open(&path).unwrap();
        pager
            .set(format!("cycle-{}", cycle).as_bytes(), b"done")
            .unwrap();
    }

    let pager = Pager::open(&path).unwrap();
    for cycle in 0..5u32 {
        assert_eq!(
            pager.get(format!("cycle-{}", cycle).as_bytes()),
            Some(b"done".to_vec())
        );
    }
}

#[test]
fn empty_database_reopens_empty() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("index.db");

    {
        let _pager = Pager::open(&path).unwrap();
        // no writes, no commits
    }

    let pager = Pager::open(&path).unwrap();
    assert_eq!(pager.root(), 0);
    assert_eq!(pager.get(b"anything"), None);
}
