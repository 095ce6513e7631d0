use std::fmt;

use serde::{Deserialize, Serialize};

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Length of a store-assigned identifier in its hex form.
pub const SONG_ID_LEN: usize = 24;

/// Opaque, store-assigned song identifier.
///
/// The document store hands out 12-byte object ids; on the wire they travel
/// as 24 lowercase hex characters. [`SongId::parse`] is the only way to build
/// one from untrusted input, so a `SongId` is always well-formed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SongId(String);

impl SongId {
    /// Parse a path segment into an identifier.
    ///
    /// Accepts upper or lower case hex and normalizes to lower case.
    /// Returns `None` for anything that is not exactly 24 hex digits.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.len() != SONG_ID_LEN || !raw.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        Some(Self(raw.to_ascii_lowercase()))
    }

    /// Build an identifier from the store's raw 12-byte key.
    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        let hex = bytes.iter().map(|b| format!("{b:02x}")).collect();
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SongId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
