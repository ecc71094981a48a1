//! Entry identity and timestamp rules.

use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};

use super::error::InvalidEntryId;

/// Number of hex characters kept from the identity digest.
pub const ENTRY_ID_LEN: usize = 32;

/// Longest id accepted from callers; derived ids are far shorter.
pub const MAX_ENTRY_ID_LEN: usize = 128;

/// Smallest step `updated_at` advances by on an edit; matches the resolution
/// of Postgres `timestamptz`.
pub const UPDATE_TICK: Duration = Duration::microseconds(1);

/// Derive the identifier of a new entry from its content, title and creation
/// instant. Identical content and title written at different instants yield
/// different ids.
pub fn derive_entry_id(content: &str, title: &str, created_at: OffsetDateTime) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hasher.update([0u8]);
    hasher.update(title.as_bytes());
    hasher.update([0u8]);
    hasher.update(created_at.unix_timestamp_nanos().to_be_bytes());
    let mut id = hex::encode(hasher.finalize());
    id.truncate(ENTRY_ID_LEN);
    id
}

/// Timestamp to record for an edit made at `now` to an entry last updated at
/// `previous`. Always strictly later than `previous`.
pub fn next_updated_at(previous: OffsetDateTime, now: OffsetDateTime) -> OffsetDateTime {
    let floor = previous + UPDATE_TICK;
    if now >= floor { now } else { floor }
}

/// Reject ids that cannot have been produced by [`derive_entry_id`] before
/// they reach storage.
pub fn validate_entry_id(id: &str) -> Result<(), InvalidEntryId> {
    if id.is_empty() {
        return Err(InvalidEntryId::Empty);
    }
    if id.len() > MAX_ENTRY_ID_LEN {
        return Err(InvalidEntryId::TooLong {
            max: MAX_ENTRY_ID_LEN,
        });
    }
    if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(InvalidEntryId::Charset { id: id.to_string() });
    }
    Ok(())
}
