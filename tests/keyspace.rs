//! # Key-Space Soak Test
//!
//! Ten thousand pseudo-random 20-byte keys with 100-byte values, loaded
//! in one batch epoch, verified through a close/open cycle, with a bound
//! on the final file size.
//!
//! The generator is a deterministic splitmix64 permutation, so the
//! verification pass can regenerate every key/value pair without storing
//! them.

use tempfile::tempdir;
use winniedb::storage::Pager;

const KEYS: u64 = 10_000;
const VAL_LEN: usize = 100;

/// splitmix64: a bijection on u64, giving unique well-scattered keys.
fn scramble(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e3779b97f4a7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d049bb133111eb);
    x ^ (x >> 31)
}

fn key_for(i: u64) -> String {
    format!("{:020x}", scramble(i))
}

/// xorshift64 stream seeded from the key's scramble.
fn value_for(i: u64) -> Vec<u8> {
    let mut state = scramble(i) | 1;
    let mut out = Vec::with_capacity(VAL_LEN);
    while out.len() < VAL_LEN {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        out.extend_from_slice(&state.to_le_bytes());
    }
    out.truncate(VAL_LEN);
    out
}

#[test]
fn ten_thousand_keys_survive_restart_within_size_bound() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("index.db");

    {
        let mut pager = Pager::open(&path).unwrap();
        for i in 0..KEYS {
            pager.insert(key_for(i).as_bytes(), &value_for(i));
        }
        pager.commit().unwrap();
    }

    let pager = Pager::open(&path).unwrap();
    for i in 0..KEYS {
        let key = key_for(i);
        assert_eq!(
            pager.get(key.as_bytes()),
            Some(value_for(i)),
            "wrong value for key {} (#{})",
            key,
            i
        );
    }
    assert_eq!(pager.get(b"00000000000000000000"), None);

    let payload_bytes = KEYS * (20 + VAL_LEN as u64);
    let file_len = std::fs::metadata(&path).unwrap().len();
    assert!(
        file_len <= 3 * payload_bytes,
        "file is {} bytes for {} bytes of payload",
        file_len,
        payload_bytes
    );
}

#[test]
fn overwrite_heavy_batch_keeps_last_writes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("index.db");

    {
        let mut pager = Pager::open(&path).unwrap();
        // Every key written twice in one epoch; the second write wins.
        for i in 0..500u64 {
            pager.insert(key_for(i).as_bytes(), b"first");
        }
        for i in 0..500u64 {
            pager.insert(key_for(i).as_bytes(), &value_for(i));
        }
        pager.commit().unwrap();
    }

    let pager = Pager::open(&path).unwrap();
    for i in 0..500u64 {
        assert_eq!(pager.get(key_for(i).as_bytes()), Some(value_for(i)));
    }
}
