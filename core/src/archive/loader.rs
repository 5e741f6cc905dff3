//! Archive loading from an in-memory buffer (ZIP/CBZ containers).

use std::io::{Cursor, Read};
use std::sync::Arc;

use anyhow::{Context, anyhow};
use parking_lot::Mutex;
use tracing::debug;
use zip::read::ZipArchive;

use crate::error::LoadError;
use crate::types::ArchiveFormat;

use super::classify::extension_of;
use super::entry::{EntryInfo, EntryReader, OpenedArchive};

/// Archive extensions accepted when no configuration overrides them.
pub const DEFAULT_ARCHIVE_EXTENSIONS: &[&str] = &["zip", "cbz"];

/// Most bytes reserved up front for one entry, whatever its header claims.
const MAX_PREALLOC_BYTES: u64 = 64 * 1024 * 1024;
/// Deflate cannot expand data by much more than this ratio.
const MAX_EXPANSION_RATIO: u64 = 1032;

/// Opens named byte buffers as archives, deciding the container format from the name.
#[derive(Debug, Clone)]
pub struct ArchiveLoader {
    extensions: Vec<String>,
}

impl Default for ArchiveLoader {
    fn default() -> Self {
        Self::new(DEFAULT_ARCHIVE_EXTENSIONS.iter().map(|ext| ext.to_string()))
    }
}

impl ArchiveLoader {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let extensions = extensions.into_iter().map(|ext| ext.into().to_ascii_lowercase());
        Self { extensions: extensions.collect() }
    }

    /// Resolve the container format for `name` without looking at any bytes.
    pub fn detect_format(&self, name: &str) -> Result<ArchiveFormat, LoadError> {
        match extension_of(name) {
            Some(ext) if self.extensions.contains(&ext) => Ok(ArchiveFormat::Zip),
            other => Err(LoadError::UnsupportedFormat { extension: other.unwrap_or_default() }),
        }
    }

    /// Open `bytes` as the archive called `name`.
    ///
    /// The returned archive lists every stored item, directories included, in central directory
    /// order. Entry contents are not decompressed here.
    pub fn open(&self, name: &str, bytes: Vec<u8>) -> Result<OpenedArchive, LoadError> {
        let format = self.detect_format(name)?;
        if bytes.is_empty() {
            return Err(LoadError::CorruptArchive("archive buffer is empty".to_string()));
        }

        let size = bytes.len();
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|err| LoadError::CorruptArchive(err.to_string()))?;

        let mut infos = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let file = archive
                .by_index_raw(index)
                .map_err(|err| LoadError::CorruptArchive(err.to_string()))?;
            infos.push(EntryInfo { name: file.name().to_string(), is_dir: file.is_dir(), index });
        }

        debug!(
            target: "archive::loader",
            archive = name,
            bytes = size,
            entries = infos.len(),
            "opened archive"
        );

        let reader = Arc::new(ZipEntryReader { archive: Mutex::new(archive) });
        Ok(OpenedArchive::from_reader(format, infos, reader))
    }
}

/// [`EntryReader`] over a zip archive held in memory.
#[derive(Debug)]
struct ZipEntryReader {
    archive: Mutex<ZipArchive<Cursor<Vec<u8>>>>,
}

impl EntryReader for ZipEntryReader {
    fn read(&self, index: usize) -> crate::Result<Vec<u8>> {
        let mut archive = self.archive.lock();
        let mut file = archive.by_index(index).map_err(|err| anyhow!("{}", err))?;

        // Header sizes are untrusted; the buffer grows with what actually decompresses.
        let hint = file
            .size()
            .min(file.compressed_size().saturating_mul(MAX_EXPANSION_RATIO))
            .min(MAX_PREALLOC_BYTES);
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(hint as usize)
            .map_err(|err| anyhow!("reserving {hint} bytes for {}: {err}", file.name()))?;
        file.read_to_end(&mut bytes).with_context(|| format!("decompressing {}", file.name()))?;
        Ok(bytes)
    }
}
