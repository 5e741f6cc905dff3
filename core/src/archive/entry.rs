//! Backend-neutral archive entries with lazy, read-once byte access.

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::error::EntryReadError;
use crate::types::ArchiveFormat;

/// Random access to the stored items of an opened archive.
///
/// Any container that can list its entries and read one of them by position can back an
/// [`OpenedArchive`]; the zip reader is one implementation.
pub trait EntryReader: Send + Sync + fmt::Debug {
    /// Decompress the entry stored at `index`.
    fn read(&self, index: usize) -> crate::Result<Vec<u8>>;
}

/// Listing information for one stored item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    pub name: String,
    pub is_dir: bool,
    pub index: usize,
}

/// One item stored in an archive.
///
/// The byte accessor is deferred: nothing is decompressed until [`ArchiveEntry::read`] is called,
/// and only the first call touches the backend. Later calls hand back the same outcome.
pub struct ArchiveEntry {
    info: EntryInfo,
    reader: Arc<dyn EntryReader>,
    bytes: OnceLock<Result<Arc<[u8]>, EntryReadError>>,
}

impl ArchiveEntry {
    pub fn new(info: EntryInfo, reader: Arc<dyn EntryReader>) -> Self {
        Self { info, reader, bytes: OnceLock::new() }
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn is_dir(&self) -> bool {
        self.info.is_dir || self.info.name.ends_with('/')
    }

    pub fn index(&self) -> usize {
        self.info.index
    }

    pub fn read(&self) -> Result<Arc<[u8]>, EntryReadError> {
        self.bytes
            .get_or_init(|| {
                self.reader.read(self.info.index).map(Arc::from).map_err(|err| EntryReadError {
                    name: self.info.name.clone(),
                    reason: format!("{err:#}"),
                })
            })
            .clone()
    }
}

impl fmt::Debug for ArchiveEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveEntry")
            .field("name", &self.info.name)
            .field("is_dir", &self.info.is_dir)
            .field("index", &self.info.index)
            .field("read", &self.bytes.get().is_some())
            .finish()
    }
}

/// Structured view of an archive: every stored item, in container order.
#[derive(Debug)]
pub struct OpenedArchive {
    format: ArchiveFormat,
    entries: Vec<ArchiveEntry>,
}

impl OpenedArchive {
    pub fn from_reader(
        format: ArchiveFormat,
        infos: Vec<EntryInfo>,
        reader: Arc<dyn EntryReader>,
    ) -> Self {
        let entries = infos
            .into_iter()
            .map(|info| ArchiveEntry::new(info, Arc::clone(&reader)))
            .collect();
        Self { format, entries }
    }

    pub fn format(&self) -> ArchiveFormat {
        self.format
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<ArchiveEntry> {
        self.entries
    }
}
