//! Page candidate selection: filtering, content kind inference, and natural ordering.

use tracing::debug;

use crate::types::ContentKind;

use super::entry::ArchiveEntry;
use super::sort::natural_cmp;

/// Housekeeping extensions that never hold a page (e.g. `Thumbs.db`).
pub const DEFAULT_BLOCKED_EXTENSIONS: &[&str] = &["db"];

/// Lowercase extension of the final path segment of `name`.
///
/// Returns `None` when the segment has no dot or nothing follows the last dot.
pub fn extension_of(name: &str) -> Option<String> {
    let file_name = name.rsplit('/').next().unwrap_or(name);
    let (_, ext) = file_name.rsplit_once('.')?;
    if ext.is_empty() { None } else { Some(ext.to_ascii_lowercase()) }
}

/// Content kind for an admissible extension; unknown image extensions get the generic kind.
pub fn kind_for_extension(ext: &str) -> ContentKind {
    ContentKind::from_extension(ext).unwrap_or(ContentKind::GENERIC)
}

/// An entry selected as a page, paired with the kind it will be served as.
#[derive(Debug)]
pub struct Candidate {
    pub entry: ArchiveEntry,
    pub kind: ContentKind,
}

#[derive(Debug, Clone)]
pub struct EntryClassifier {
    blocked: Vec<String>,
}

impl Default for EntryClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCKED_EXTENSIONS.iter().map(|ext| ext.to_string()))
    }
}

impl EntryClassifier {
    pub fn new<I, S>(blocked: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { blocked: blocked.into_iter().map(|ext| ext.into().to_ascii_lowercase()).collect() }
    }

    /// Kind the entry would be served as, or `None` when it is not a page.
    pub fn page_kind(&self, entry: &ArchiveEntry) -> Option<ContentKind> {
        if entry.is_dir() {
            return None;
        }
        let ext = extension_of(entry.name())?;
        if self.blocked.contains(&ext) {
            return None;
        }
        Some(kind_for_extension(&ext))
    }

    /// Filter `entries` down to page candidates in natural order.
    ///
    /// The sort is stable, so entries sharing a name keep their archive order. Duplicates are
    /// left in place for the materializer to resolve.
    pub fn classify(&self, entries: Vec<ArchiveEntry>) -> Vec<Candidate> {
        let total = entries.len();
        let mut candidates: Vec<Candidate> = entries
            .into_iter()
            .filter_map(|entry| self.page_kind(&entry).map(|kind| Candidate { entry, kind }))
            .collect();

        candidates.sort_by(|a, b| natural_cmp(a.entry.name(), b.entry.name()));

        debug!(
            target: "archive::classify",
            total,
            candidates = candidates.len(),
            "classified archive entries"
        );
        candidates
    }
}
