//! Avatar image storage
//!
//! One file per avatar hash under `<data_dir>/avatars/`, with the content
//! type in a `<hash>.type` sidecar. Images are written once and never
//! replaced: the same hash always names the same picture.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::errors::{StoreError, StoreResult};

/// Directory under the data directory holding avatar images
pub const AVATAR_DIR_NAME: &str = "avatars";

/// Length of an avatar hash in hex chars
pub const AVATAR_HASH_LEN: usize = 6;

/// A stored avatar image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Avatar {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Whether `hash` can name an avatar. Anything else never touches the disk.
pub fn is_avatar_hash(hash: &str) -> bool {
    hash.len() == AVATAR_HASH_LEN
        && hash.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Filesystem store of avatar images keyed by avatar hash.
#[derive(Debug)]
pub struct AvatarStore {
    root: PathBuf,
}

impl AvatarStore {
    /// Opens the avatar directory under `data_dir`, creating it if needed.
    pub fn open(data_dir: &Path) -> StoreResult<Self> {
        let root = data_dir.join(AVATAR_DIR_NAME);
        fs::create_dir_all(&root).map_err(|e| {
            StoreError::write_failure(
                format!("Failed to create avatar directory: {}", root.display()),
                e,
            )
        })?;
        Ok(Self { root })
    }

    fn image_path(&self, hash: &str) -> PathBuf {
        self.root.join(hash)
    }

    fn type_path(&self, hash: &str) -> PathBuf {
        self.root.join(format!("{}.type", hash))
    }

    pub fn contains(&self, hash: &str) -> bool {
        is_avatar_hash(hash) && self.image_path(hash).exists()
    }

    /// Stores the image produced by `render` unless `hash` already has one.
    ///
    /// Returns whether anything was written.
    pub fn put_if_absent(&self, hash: &str, render: impl FnOnce() -> Avatar) -> StoreResult<bool> {
        if !is_avatar_hash(hash) {
            return Err(StoreError::write_failure(
                format!("Invalid avatar hash: {:?}", hash),
                io::Error::from(io::ErrorKind::InvalidInput),
            ));
        }
        if self.contains(hash) {
            return Ok(false);
        }

        let avatar = render();
        // Sidecar first: an image without its type is treated as absent
        write_synced(&self.type_path(hash), avatar.content_type.as_bytes())?;
        write_synced(&self.image_path(hash), &avatar.bytes)?;

        debug!(avatar_hash = hash, bytes = avatar.bytes.len(), "avatar stored");
        Ok(true)
    }

    /// Looks up an avatar. Unknown or malformed hashes are `None`.
    pub fn get(&self, hash: &str) -> StoreResult<Option<Avatar>> {
        if !is_avatar_hash(hash) {
            return Ok(None);
        }

        let Some(bytes) = read_optional(&self.image_path(hash))? else {
            return Ok(None);
        };
        let Some(content_type) = read_optional(&self.type_path(hash))? else {
            return Ok(None);
        };

        Ok(Some(Avatar {
            content_type: String::from_utf8_lossy(&content_type).into_owned(),
            bytes,
        }))
    }
}

fn read_optional(path: &Path) -> StoreResult<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::read_failure(
            format!("Failed to read avatar: {}", path.display()),
            e,
        )),
    }
}

/// Writes to a temp file, fsyncs, and renames into place.
fn write_synced(path: &Path, data: &[u8]) -> StoreResult<()> {
    let tmp_path = path.with_extension("tmp");
    let fail = |e| StoreError::write_failure(format!("Failed to write avatar: {}", path.display()), e);

    let mut file = File::create(&tmp_path).map_err(fail)?;
    file.write_all(data).map_err(fail)?;
    file.sync_all().map_err(fail)?;
    fs::rename(&tmp_path, path).map_err(fail)
}
