//! Comment Store Integrity Tests
//!
//! - Corruption in the log is never ignored
//! - Completed writes survive reopen
//! - Scans are ordered by date whatever the insertion order
//! - Appends in the same millisecond never overwrite each other

use std::fs;
use std::sync::Arc;
use std::thread;

use commentd::store::{Comment, CommentStore, StoreError, LOG_FILE_NAME};
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

fn dated(document_id: &str, date: i64, body: &str) -> Comment {
    let mut comment = Comment::new(document_id, "tester", body);
    comment.date = date;
    comment
}

fn dates(store: &CommentStore, document_id: &str) -> Vec<i64> {
    store
        .scan_document(document_id)
        .unwrap()
        .map(|c| c.unwrap().date)
        .collect()
}

// =============================================================================
// Corruption
// =============================================================================

/// A flipped byte anywhere in the log fails the open.
#[test]
fn test_corruption_fails_open() {
    let temp_dir = TempDir::new().unwrap();
    {
        let store = CommentStore::open(temp_dir.path()).unwrap();
        store.put(&dated("post", 100, "first")).unwrap();
        store.put(&dated("post", 200, "second")).unwrap();
    }

    let log_path = temp_dir.path().join(LOG_FILE_NAME);
    let mut contents = fs::read(&log_path).unwrap();
    let mid = contents.len() / 2;
    contents[mid] ^= 0xFF;
    fs::write(&log_path, contents).unwrap();

    match CommentStore::open(temp_dir.path()) {
        Err(err @ StoreError::Corruption { .. }) => {
            assert!(err.is_fatal());
        }
        Err(other) => panic!("expected corruption, got {}", other),
        Ok(_) => panic!("corrupted log must not open"),
    }
}

/// A torn final record is corruption too, not a silently dropped write.
#[test]
fn test_truncated_tail_fails_open() {
    let temp_dir = TempDir::new().unwrap();
    {
        let store = CommentStore::open(temp_dir.path()).unwrap();
        store.put(&dated("post", 100, "first")).unwrap();
    }

    let log_path = temp_dir.path().join(LOG_FILE_NAME);
    let contents = fs::read(&log_path).unwrap();
    fs::write(&log_path, &contents[..contents.len() - 2]).unwrap();

    assert!(matches!(
        CommentStore::open(temp_dir.path()),
        Err(StoreError::Corruption { .. })
    ));
}

// =============================================================================
// Durability
// =============================================================================

/// Puts and deletes replay to the same state after reopen.
#[test]
fn test_reopen_replays_puts_and_deletes() {
    let temp_dir = TempDir::new().unwrap();
    {
        let store = CommentStore::open(temp_dir.path()).unwrap();
        store.put(&dated("post", 100, "kept")).unwrap();
        store.put(&dated("post", 200, "deleted")).unwrap();
        store.put(&dated("other", 50, "elsewhere")).unwrap();
        store.delete("post", 200).unwrap();
        store.close().unwrap();
    }

    let store = CommentStore::open(temp_dir.path()).unwrap();
    assert_eq!(store.len(), 2);
    assert_eq!(dates(&store, "post"), vec![100]);
    assert_eq!(store.get("post", 100).unwrap().unwrap().body, "kept");
    assert!(store.get("post", 200).unwrap().is_none());
}

/// Compaction keeps every live comment and shrinks the log.
#[test]
fn test_compaction_preserves_live_set() {
    let temp_dir = TempDir::new().unwrap();
    let store = CommentStore::open(temp_dir.path()).unwrap();
    for date in 1..=20 {
        store.put(&dated("post", date, "body")).unwrap();
    }
    for date in 1..=15 {
        store.delete("post", date).unwrap();
    }

    let before = fs::metadata(store.log_path()).unwrap().len();
    store.compact().unwrap();
    let after = fs::metadata(store.log_path()).unwrap().len();
    assert!(after < before);

    store.put(&dated("post", 99, "after compaction")).unwrap();
    drop(store);

    let reopened = CommentStore::open(temp_dir.path()).unwrap();
    assert_eq!(dates(&reopened, "post"), vec![16, 17, 18, 19, 20, 99]);
}

// =============================================================================
// Ordering and isolation
// =============================================================================

/// Insertion order does not matter; scans are ascending by date.
#[test]
fn test_scan_is_date_ordered() {
    let temp_dir = TempDir::new().unwrap();
    let store = CommentStore::open(temp_dir.path()).unwrap();
    for date in [300, 100, 500, 200] {
        store.put(&dated("post", date, "x")).unwrap();
    }
    store.put(&dated("post1", 150, "neighbour")).unwrap();
    store.put(&dated("pos", 250, "neighbour")).unwrap();

    assert_eq!(dates(&store, "post"), vec![100, 200, 300, 500]);
}

/// Empty and unknown documents scan to nothing.
#[test]
fn test_unknown_document_is_empty() {
    let temp_dir = TempDir::new().unwrap();
    let store = CommentStore::open(temp_dir.path()).unwrap();
    assert_eq!(store.scan_document("nothing").unwrap().count(), 0);
    assert!(matches!(
        store.scan_document("bad id"),
        Err(StoreError::InvalidKey(_))
    ));
}

// =============================================================================
// Concurrency
// =============================================================================

/// Concurrent appends to one document all land, at distinct dates.
#[test]
fn test_concurrent_appends_never_collide() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(CommentStore::open(temp_dir.path()).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..10 {
                    let comment = Comment::new("post", "writer", format!("{}-{}", t, i));
                    store.append("post", comment).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let stored = dates(&store, "post");
    assert_eq!(stored.len(), 80);
    let mut deduped = stored.clone();
    deduped.dedup();
    assert_eq!(deduped, stored, "dates must be unique and ascending");
}

/// An append is visible to a scan issued right after it returns.
#[test]
fn test_append_then_scan_sees_write() {
    let temp_dir = TempDir::new().unwrap();
    let store = CommentStore::open(temp_dir.path()).unwrap();

    let stored = store
        .append("post42", Comment::new("post42", "Alice", "hello"))
        .unwrap();

    let found: Vec<_> = store
        .scan_document("post42")
        .unwrap()
        .map(|c| c.unwrap())
        .collect();
    assert_eq!(found, vec![stored]);
}
