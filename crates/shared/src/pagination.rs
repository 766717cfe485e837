//! Cursor-based pagination utilities for key listings.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use thiserror::Error;

/// Error type for cursor operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CursorError {
    #[error("Invalid cursor format")]
    InvalidFormat,
    #[error("Invalid cursor encoding")]
    InvalidEncoding,
}

/// Prefix that marks a listing cursor, so foreign tokens are rejected early.
const CURSOR_TAG: &str = "k:";

/// Encodes a cursor from the last key returned by a listing page.
///
/// The cursor format is: base64("k:" + key). Listings resume strictly after
/// the encoded key.
pub fn encode_cursor(last_key: &str) -> String {
    let raw = format!("{CURSOR_TAG}{last_key}");
    URL_SAFE_NO_PAD.encode(raw.as_bytes())
}

/// Decodes a cursor back into the key the next page starts after.
pub fn decode_cursor(cursor: &str) -> Result<String, CursorError> {
    let decoded = URL_SAFE_NO_PAD
        .decode(cursor)
        .map_err(|_| CursorError::InvalidEncoding)?;

    let s = String::from_utf8(decoded).map_err(|_| CursorError::InvalidFormat)?;

    s.strip_prefix(CURSOR_TAG)
        .map(str::to_string)
        .ok_or(CursorError::InvalidFormat)
}
