//! Failure taxonomy for archive loads.

use thiserror::Error;

/// Load-level failures. Any of these aborts the whole load and is shown to the reader.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("unsupported archive format {extension:?}")]
    UnsupportedFormat { extension: String },

    #[error("failed to open archive: {0}")]
    CorruptArchive(String),

    #[error("failed to fetch archive: {0}")]
    Fetch(String),
}

/// A single entry could not be read. Recovered by dropping the entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to read entry {name:?}: {reason}")]
pub struct EntryReadError {
    pub name: String,
    pub reason: String,
}
