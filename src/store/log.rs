//! Append-only record log
//!
//! `LogWriter` appends records with an fsync after every write; `LogReader`
//! scans them sequentially and validates every checksum. Any corruption,
//! including a torn final record, is reported as fatal.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use super::errors::{StoreError, StoreResult};
use super::record::{LogRecord, MIN_RECORD_SIZE};

/// File name of the record log inside the data directory
pub const LOG_FILE_NAME: &str = "comments.log";

/// Appends records to the log file with fsync enforcement.
pub struct LogWriter {
    path: PathBuf,
    file: File,
    current_offset: u64,
}

impl LogWriter {
    /// Opens or creates the log at `path`, creating parent directories.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    StoreError::write_failure(
                        format!("Failed to create data directory: {}", parent.display()),
                        e,
                    )
                })?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                StoreError::write_failure(format!("Failed to open log: {}", path.display()), e)
            })?;

        let current_offset = file
            .metadata()
            .map_err(|e| StoreError::write_failure("Failed to read log metadata", e))?
            .len();

        Ok(Self {
            path: path.to_path_buf(),
            file,
            current_offset,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte length of the log written so far.
    pub fn current_offset(&self) -> u64 {
        self.current_offset
    }

    /// Appends a record and fsyncs it.
    ///
    /// Returns the byte offset where the record starts.
    pub fn append(&mut self, record: &LogRecord) -> StoreResult<u64> {
        let serialized = record.serialize();
        let offset = self.current_offset;

        self.file.write_all(&serialized).map_err(|e| {
            StoreError::write_failure(format!("Failed to append record at {}", offset), e)
        })?;

        self.sync()?;

        self.current_offset += serialized.len() as u64;
        Ok(offset)
    }

    /// fsync the log file.
    pub fn sync(&mut self) -> StoreResult<()> {
        self.file
            .sync_all()
            .map_err(|e| StoreError::write_failure("fsync failed on log", e))
    }

    /// Moves the log file to `path`, replacing whatever is there.
    ///
    /// The open handle follows the file, so later appends land at the new
    /// path. On error the writer still points at its old path.
    pub fn rename_to(&mut self, path: &Path) -> StoreResult<()> {
        fs::rename(&self.path, path).map_err(|e| {
            StoreError::write_failure(format!("Failed to rename log to {}", path.display()), e)
        })?;
        self.path = path.to_path_buf();
        sync_parent_dir(path);
        Ok(())
    }
}

/// Persists a rename by fsyncing the containing directory.
///
/// Failure only weakens crash durability of the rename, so it is logged.
fn sync_parent_dir(path: &Path) {
    let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) else {
        return;
    };
    if let Err(e) = File::open(dir).and_then(|handle| handle.sync_all()) {
        warn!(dir = %dir.display(), error = %e, "directory fsync failed");
    }
}

/// Sequential reader over the log.
pub struct LogReader {
    reader: BufReader<File>,
    current_offset: u64,
    file_size: u64,
}

impl LogReader {
    pub fn open(path: &Path) -> StoreResult<Self> {
        let file = File::open(path).map_err(|e| {
            StoreError::read_failure(format!("Failed to open log: {}", path.display()), e)
        })?;

        let file_size = file
            .metadata()
            .map_err(|e| StoreError::read_failure("Failed to read log metadata", e))?
            .len();

        Ok(Self {
            reader: BufReader::new(file),
            current_offset: 0,
            file_size,
        })
    }

    pub fn current_offset(&self) -> u64 {
        self.current_offset
    }

    /// Reads the next record.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(record))` if a record was read
    /// - `Ok(None)` at end of file
    /// - `Err(Corruption)` on checksum failure or truncation (fatal)
    pub fn read_next(&mut self) -> StoreResult<Option<LogRecord>> {
        if self.current_offset >= self.file_size {
            return Ok(None);
        }

        let remaining = self.file_size - self.current_offset;
        if remaining < MIN_RECORD_SIZE as u64 {
            return Err(StoreError::corruption_at_offset(
                self.current_offset,
                format!(
                    "Truncated log: {} bytes remaining, minimum record size is {}",
                    remaining, MIN_RECORD_SIZE
                ),
            ));
        }

        let mut len_buf = [0u8; 4];
        self.reader.read_exact(&mut len_buf).map_err(|e| {
            StoreError::corruption_at_offset(
                self.current_offset,
                format!("Failed to read record length: {}", e),
            )
        })?;
        let record_length = u32::from_le_bytes(len_buf) as u64;

        if record_length < MIN_RECORD_SIZE as u64 || record_length > remaining {
            return Err(StoreError::corruption_at_offset(
                self.current_offset,
                format!(
                    "Invalid record length {} with {} bytes remaining",
                    record_length, remaining
                ),
            ));
        }

        let mut record_buf = vec![0u8; record_length as usize];
        record_buf[0..4].copy_from_slice(&len_buf);
        self.reader.read_exact(&mut record_buf[4..]).map_err(|e| {
            StoreError::corruption_at_offset(
                self.current_offset,
                format!("Failed to read record body: {}", e),
            )
        })?;

        let (record, consumed) = LogRecord::deserialize(&record_buf)
            .map_err(|e| StoreError::corruption_at_offset(self.current_offset, e.to_string()))?;

        self.current_offset += consumed as u64;
        Ok(Some(record))
    }

    /// Reads every remaining record. Any corruption fails the whole read.
    pub fn read_all(&mut self) -> StoreResult<Vec<LogRecord>> {
        let mut records = Vec::new();
        while let Some(record) = self.read_next()? {
            records.push(record);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::encode;
    use crate::store::record::RecordKind;
    use tempfile::TempDir;

    fn put(date: i64) -> LogRecord {
        LogRecord::put(encode("doc", date).unwrap(), format!("{{\"d\":{}}}", date).into_bytes())
    }

    #[test]
    fn test_writer_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join(LOG_FILE_NAME);

        let _writer = LogWriter::open(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_offsets_advance() {
        let temp_dir = TempDir::new().unwrap();
        let mut writer = LogWriter::open(&temp_dir.path().join(LOG_FILE_NAME)).unwrap();

        assert_eq!(writer.current_offset(), 0);
        let first = writer.append(&put(1)).unwrap();
        let second = writer.append(&put(2)).unwrap();
        assert_eq!(first, 0);
        assert!(second > first);
        assert_eq!(writer.current_offset(), std::fs::metadata(writer.path()).unwrap().len());
    }

    #[test]
    fn test_read_back_in_write_order() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(LOG_FILE_NAME);
        {
            let mut writer = LogWriter::open(&path).unwrap();
            writer.append(&put(3)).unwrap();
            writer.append(&LogRecord::delete(encode("doc", 3).unwrap())).unwrap();
            writer.append(&put(1)).unwrap();
        }

        let records = LogReader::open(&path).unwrap().read_all().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0], put(3));
        assert_eq!(records[1].kind, RecordKind::Delete);
        assert_eq!(records[2], put(1));
    }

    #[test]
    fn test_reopen_appends_after_existing_records() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(LOG_FILE_NAME);
        {
            let mut writer = LogWriter::open(&path).unwrap();
            writer.append(&put(1)).unwrap();
        }
        {
            let mut writer = LogWriter::open(&path).unwrap();
            assert!(writer.current_offset() > 0);
            writer.append(&put(2)).unwrap();
        }

        assert_eq!(LogReader::open(&path).unwrap().read_all().unwrap().len(), 2);
    }

    #[test]
    fn test_torn_tail_is_corruption() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(LOG_FILE_NAME);
        {
            let mut writer = LogWriter::open(&path).unwrap();
            writer.append(&put(1)).unwrap();
            writer.append(&put(2)).unwrap();
        }
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 5]).unwrap();

        let mut reader = LogReader::open(&path).unwrap();
        assert!(reader.read_next().unwrap().is_some());
        let err = reader.read_next().unwrap_err();
        assert!(err.is_fatal());
    }
}
