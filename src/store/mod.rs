//! Ordered comment store
//!
//! The store holds the canonical persistent state of all comments. It is an
//! embedded ordered key-value map: an append-only, checksummed record log on
//! disk plus an in-memory `BTreeMap` index rebuilt by replaying the log.
//!
//! # Design Principles
//!
//! - Append-only log (deletes are tombstone records)
//! - Checksum-verified on every read
//! - fsync before the index is updated, so a returned write is durable and visible
//! - Ordering comes from key bytes only, never from an in-memory sort
//! - Corruption halts `open`, it is never skipped
//!
//! Avatar images live beside the log in `AvatarStore`, outside the ordered map.

mod avatars;
mod checksum;
mod comment;
mod errors;
mod log;
mod record;
#[allow(clippy::module_inception)]
mod store;

pub use avatars::{is_avatar_hash, Avatar, AvatarStore, AVATAR_DIR_NAME, AVATAR_HASH_LEN};
pub use checksum::{compute_checksum, verify_checksum};
pub use comment::Comment;
pub use errors::{Severity, StoreError, StoreResult};
pub use log::{LogReader, LogWriter, LOG_FILE_NAME};
pub use record::{LogRecord, RecordKind};
pub use store::{now_millis, CommentIter, CommentStore};
