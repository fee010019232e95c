//! The comment store: record log + ordered in-memory index
//!
//! All mutations take the write guard, append to the log, fsync, and only
//! then touch the index. Readers take a snapshot of their key range under the
//! read guard, so a scan issued after `append` returns always sees the write.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::comment::Comment;
use super::errors::{StoreError, StoreResult};
use super::log::{LogReader, LogWriter, LOG_FILE_NAME};
use super::record::{LogRecord, RecordKind};
use crate::keys::{self, KeyRange, StorageKey, MAX_DATE};

/// Milliseconds since the Unix epoch from the server clock.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

struct Inner {
    writer: LogWriter,
    index: BTreeMap<StorageKey, Vec<u8>>,
}

/// Persistent ordered map of comments keyed by `(document_id, date)`.
///
/// Opened once at process start and shared behind an `Arc`. Reads run
/// concurrently; writes are serialized.
pub struct CommentStore {
    log_path: PathBuf,
    inner: RwLock<Inner>,
}

impl CommentStore {
    /// Opens the store under `data_dir`, replaying the log into the index.
    ///
    /// # Errors
    ///
    /// `Corruption` if any record fails validation; the store is not opened.
    pub fn open(data_dir: &Path) -> StoreResult<Self> {
        let log_path = data_dir.join(LOG_FILE_NAME);
        let writer = LogWriter::open(&log_path)?;
        let index = Self::replay(&log_path)?;

        info!(
            path = %log_path.display(),
            entries = index.len(),
            bytes = writer.current_offset(),
            "comment store opened"
        );

        Ok(Self {
            log_path,
            inner: RwLock::new(Inner { writer, index }),
        })
    }

    fn replay(log_path: &Path) -> StoreResult<BTreeMap<StorageKey, Vec<u8>>> {
        let mut index = BTreeMap::new();
        let mut reader = LogReader::open(log_path)?;

        while let Some(record) = reader.read_next()? {
            match record.kind {
                RecordKind::Put => {
                    index.insert(record.key, record.value);
                }
                RecordKind::Delete => {
                    index.remove(&record.key);
                }
            }
        }

        Ok(index)
    }

    /// Path of the backing log file.
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Number of live comments.
    pub fn len(&self) -> usize {
        self.inner.read().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends a comment to `document_id`.
    ///
    /// The date is the comment's own date if set, otherwise the server clock.
    /// If another comment of the same document already holds that
    /// millisecond, the date moves forward to the next free one, so an
    /// append never replaces an existing comment.
    ///
    /// Returns the comment as stored (document id and final date filled in).
    pub fn append(&self, document_id: &str, mut comment: Comment) -> StoreResult<Comment> {
        keys::validate_document_id(document_id)?;

        let mut inner = self.inner.write();

        let mut date = if comment.date > 0 {
            comment.date
        } else {
            now_millis()
        };
        let mut key = keys::encode(document_id, date)?;
        while inner.index.contains_key(&key) {
            if date >= MAX_DATE {
                return Err(keys::KeyError::InvalidDate(date.saturating_add(1)).into());
            }
            date += 1;
            key = keys::encode(document_id, date)?;
        }

        if comment.date > 0 && comment.date != date {
            debug!(document_id, requested = comment.date, assigned = date, "date collision resolved");
        }

        comment.document_id = document_id.to_string();
        comment.date = date;
        let value = serde_json::to_vec(&comment)?;

        inner.writer.append(&LogRecord::put(key.clone(), value.clone()))?;
        inner.index.insert(key, value);

        debug!(document_id, date, "comment appended");
        Ok(comment)
    }

    /// Writes a comment at exactly its `(document_id, date)`, replacing any
    /// comment already there.
    pub fn put(&self, comment: &Comment) -> StoreResult<()> {
        let key = keys::encode(&comment.document_id, comment.date)?;
        let value = serde_json::to_vec(comment)?;

        let mut inner = self.inner.write();
        inner.writer.append(&LogRecord::put(key.clone(), value.clone()))?;
        if inner.index.insert(key, value).is_some() {
            warn!(
                document_id = %comment.document_id,
                date = comment.date,
                "put replaced an existing comment"
            );
        }
        Ok(())
    }

    /// Removes the comment at `(document_id, date)`.
    ///
    /// Deleting a key that does not exist succeeds and writes nothing.
    pub fn delete(&self, document_id: &str, date: i64) -> StoreResult<()> {
        let key = keys::encode(document_id, date)?;

        let mut inner = self.inner.write();
        if !inner.index.contains_key(&key) {
            debug!(document_id, date, "delete of absent comment ignored");
            return Ok(());
        }

        inner.writer.append(&LogRecord::delete(key.clone()))?;
        inner.index.remove(&key);

        info!(document_id, date, "comment deleted");
        Ok(())
    }

    /// Looks up a single comment.
    pub fn get(&self, document_id: &str, date: i64) -> StoreResult<Option<Comment>> {
        let key = keys::encode(document_id, date)?;
        let value = self.inner.read().index.get(&key).cloned();
        value.map(|v| decode_entry(&key, &v)).transpose()
    }

    /// Comments of one document, ascending by date.
    ///
    /// Fails with `InvalidKey` before touching the index if the id is invalid.
    pub fn scan_document(&self, document_id: &str) -> StoreResult<CommentIter> {
        let range = keys::range_for_document(document_id)?;
        Ok(self.scan(&range))
    }

    /// Every comment, ordered by document id then date.
    pub fn scan_all(&self) -> StoreResult<CommentIter> {
        Ok(self.scan(&keys::range_for_all()))
    }

    fn scan(&self, range: &KeyRange) -> CommentIter {
        let inner = self.inner.read();
        let entries: Vec<_> = inner
            .index
            .range(range.bounds())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        CommentIter {
            entries: entries.into_iter(),
        }
    }

    /// Rewrites the log with only live entries.
    ///
    /// The new log is written beside the old one, fsynced, and renamed over
    /// it, so a crash leaves either the old or the new log intact.
    pub fn compact(&self) -> StoreResult<()> {
        let mut inner = self.inner.write();
        let before = inner.writer.current_offset();

        let tmp_path = self.log_path.with_extension("log.compact");
        if tmp_path.exists() {
            fs::remove_file(&tmp_path).map_err(|e| {
                StoreError::write_failure("Failed to remove stale compaction file", e)
            })?;
        }

        let mut compacted = LogWriter::open(&tmp_path)?;
        for (key, value) in &inner.index {
            compacted.append(&LogRecord::put(key.clone(), value.clone()))?;
        }

        // The old writer stays in place until the rename has succeeded
        compacted.rename_to(&self.log_path)?;
        inner.writer = compacted;

        info!(
            entries = inner.index.len(),
            bytes_before = before,
            bytes_after = inner.writer.current_offset(),
            "comment log compacted"
        );
        Ok(())
    }

    /// Forces the log to disk.
    pub fn flush(&self) -> StoreResult<()> {
        self.inner.write().writer.sync()
    }

    /// Flushes and releases the store. Use at shutdown.
    pub fn close(self) -> StoreResult<()> {
        self.flush()?;
        info!(path = %self.log_path.display(), "comment store closed");
        Ok(())
    }
}

fn decode_entry(key: &StorageKey, value: &[u8]) -> StoreResult<Comment> {
    let (document_id, date) = keys::decode(key)?;
    let mut comment: Comment = serde_json::from_slice(value)?;
    comment.document_id = document_id;
    comment.date = date;
    Ok(comment)
}

/// Snapshot iterator over a key range; values are decoded lazily.
///
/// Scanning again starts a fresh snapshot.
pub struct CommentIter {
    entries: std::vec::IntoIter<(StorageKey, Vec<u8>)>,
}

impl Iterator for CommentIter {
    type Item = StoreResult<Comment>;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries
            .next()
            .map(|(key, value)| decode_entry(&key, &value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl ExactSizeIterator for CommentIter {}
