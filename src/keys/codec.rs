//! Fixed-width key encoding
//!
//! Key layout:
//!
//! ```text
//! +----------------------+------+------------------------+
//! | document id (10, '0') | 0x00 | date ms (15, '0')      |
//! +----------------------+------+------------------------+
//! ```

use std::fmt;
use std::ops::Bound;

use super::errors::{KeyError, KeyResult};

/// Width of the padded document id part
pub const DOCUMENT_ID_WIDTH: usize = 10;

/// Width of the padded date part
pub const DATE_WIDTH: usize = 15;

/// Separator between id and date; sorts below every ASCII digit and letter
pub const KEY_SEPARATOR: u8 = 0x00;

/// Exclusive upper bound appended to a padded id to close a document range
pub const RANGE_TERMINATOR: u8 = 0xFF;

/// Largest date representable in `DATE_WIDTH` decimal digits
pub const MAX_DATE: i64 = 999_999_999_999_999;

const KEY_LEN: usize = DOCUMENT_ID_WIDTH + 1 + DATE_WIDTH;

/// An encoded storage key. Ordering is plain byte ordering.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StorageKey(Vec<u8>);

impl StorageKey {
    /// Wrap raw bytes read back from the log.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl fmt::Debug for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StorageKey(\"{}\")", self.0.escape_ascii())
    }
}

/// A half-open key range. `None` bounds are unbounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRange {
    /// Inclusive lower bound
    pub start: Option<StorageKey>,
    /// Exclusive upper bound
    pub end: Option<StorageKey>,
}

impl KeyRange {
    /// Whether `key` falls inside this range
    pub fn contains(&self, key: &StorageKey) -> bool {
        let above_start = self.start.as_ref().map_or(true, |s| key >= s);
        let below_end = self.end.as_ref().map_or(true, |e| key < e);
        above_start && below_end
    }

    /// Bounds suitable for `BTreeMap::range`
    pub fn bounds(&self) -> (Bound<StorageKey>, Bound<StorageKey>) {
        let start = match &self.start {
            Some(key) => Bound::Included(key.clone()),
            None => Bound::Unbounded,
        };
        let end = match &self.end {
            Some(key) => Bound::Excluded(key.clone()),
            None => Bound::Unbounded,
        };
        (start, end)
    }
}

/// Checks a document id against the key alphabet and width.
pub fn validate_document_id(document_id: &str) -> KeyResult<()> {
    let invalid = |reason| KeyError::InvalidDocumentId {
        document_id: document_id.to_string(),
        reason,
    };

    if document_id.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if document_id.len() > DOCUMENT_ID_WIDTH {
        return Err(invalid("longer than 10 characters"));
    }
    if !document_id.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(invalid("characters outside [A-Za-z0-9]"));
    }
    if document_id.starts_with('0') {
        return Err(invalid("must not start with '0'"));
    }
    Ok(())
}

fn padded_document_id(document_id: &str) -> KeyResult<Vec<u8>> {
    validate_document_id(document_id)?;
    Ok(format!("{:0>width$}", document_id, width = DOCUMENT_ID_WIDTH).into_bytes())
}

/// Encodes `(document_id, date)` into its storage key.
///
/// # Errors
///
/// `InvalidDocumentId` for ids rejected by [`validate_document_id`],
/// `InvalidDate` for dates outside `0..=MAX_DATE`.
pub fn encode(document_id: &str, date: i64) -> KeyResult<StorageKey> {
    if !(0..=MAX_DATE).contains(&date) {
        return Err(KeyError::InvalidDate(date));
    }

    let mut key = padded_document_id(document_id)?;
    key.reserve(1 + DATE_WIDTH);
    key.push(KEY_SEPARATOR);
    key.extend_from_slice(format!("{:0>width$}", date, width = DATE_WIDTH).as_bytes());
    Ok(StorageKey(key))
}

/// Recovers `(document_id, date)` from a storage key.
pub fn decode(key: &StorageKey) -> KeyResult<(String, i64)> {
    let bytes = key.as_bytes();
    let malformed = |reason: &str| KeyError::MalformedKey(format!("{:?}: {}", key, reason));

    if bytes.len() != KEY_LEN {
        return Err(malformed("wrong length"));
    }
    if bytes[DOCUMENT_ID_WIDTH] != KEY_SEPARATOR {
        return Err(malformed("missing separator"));
    }

    let id_part = &bytes[..DOCUMENT_ID_WIDTH];
    let date_part = &bytes[DOCUMENT_ID_WIDTH + 1..];

    if !id_part.iter().all(u8::is_ascii_alphanumeric) {
        return Err(malformed("document id outside [A-Za-z0-9]"));
    }
    if !date_part.iter().all(u8::is_ascii_digit) {
        return Err(malformed("date is not decimal"));
    }

    let first_significant = id_part
        .iter()
        .position(|&b| b != b'0')
        .ok_or_else(|| malformed("empty document id"))?;
    let document_id = String::from_utf8_lossy(&id_part[first_significant..]).into_owned();

    let date = std::str::from_utf8(date_part)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| malformed("date does not parse"))?;

    Ok((document_id, date))
}

/// Range covering every key of `document_id` and nothing else.
pub fn range_for_document(document_id: &str) -> KeyResult<KeyRange> {
    let start = padded_document_id(document_id)?;
    let mut end = start.clone();
    end.push(RANGE_TERMINATOR);
    Ok(KeyRange {
        start: Some(StorageKey(start)),
        end: Some(StorageKey(end)),
    })
}

/// Unbounded range over the whole store.
pub fn range_for_all() -> KeyRange {
    KeyRange {
        start: None,
        end: None,
    }
}
