//! Composite storage keys for the comment store
//!
//! A comment lives at `pad(document_id, 10) ++ 0x00 ++ pad(date, 15)`. Both
//! parts are left-padded with ASCII `'0'` to a fixed width, so byte order of
//! keys equals (document id, date) order and a single document occupies one
//! contiguous key range.
//!
//! # Invariants
//!
//! - Widths are never exceeded: oversize inputs are rejected, not truncated
//! - The separator sorts below every padded digit, the range terminator
//!   (`0xFF`) above every suffix byte
//! - Document ids never start with `'0'` (padding would alias them)

mod codec;
mod errors;

pub use codec::{
    decode, encode, range_for_all, range_for_document, validate_document_id, KeyRange,
    StorageKey, DATE_WIDTH, DOCUMENT_ID_WIDTH, KEY_SEPARATOR, MAX_DATE, RANGE_TERMINATOR,
};
pub use errors::{KeyError, KeyResult};
