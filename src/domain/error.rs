use thiserror::Error;

/// Why a string cannot name an entry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidEntryId {
    #[error("entry id is empty")]
    Empty,
    #[error("entry id is longer than {max} characters")]
    TooLong { max: usize },
    #[error("entry id `{id}` contains characters outside [A-Za-z0-9_-]")]
    Charset { id: String },
}
