//! Turns ordered page candidates into renderable pages backed by registry handles.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::archive::Candidate;
use crate::codec::probe_dimensions;
use crate::resource::{Disposer, ResourceRegistry};
use crate::stats::StatsCollector;
use crate::types::{Page, SessionId};

/// The page list of one viewing session together with the handles it owns.
///
/// Pages are immutable once built. Releasing the session (explicitly or by dropping it)
/// invalidates every handle in `pages`.
#[derive(Debug)]
pub struct PageSession {
    id: SessionId,
    pages: Vec<Page>,
    disposer: Disposer,
}

impl PageSession {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Release the session's resources now rather than on drop.
    pub fn release(&mut self) -> usize {
        self.disposer.release()
    }

    pub fn into_parts(self) -> (SessionId, Vec<Page>, Disposer) {
        (self.id, self.pages, self.disposer)
    }
}

#[derive(Debug)]
pub struct Materializer {
    registry: Arc<ResourceRegistry>,
    probe: bool,
    stats: Option<Arc<StatsCollector>>,
}

impl Materializer {
    pub fn new(registry: Arc<ResourceRegistry>) -> Self {
        Self { registry, probe: true, stats: None }
    }

    /// Toggle reading image headers to fill in [`Page::dimensions`].
    pub fn with_probe(mut self, probe: bool) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_stats(mut self, stats: Arc<StatsCollector>) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Read every candidate in order and register the survivors under a new session.
    ///
    /// An entry that fails to read is logged and skipped. When several candidates share a name,
    /// the first one that reads successfully is kept and the rest are never read. Output order
    /// is the input order.
    pub fn materialize(&self, candidates: Vec<Candidate>) -> PageSession {
        let session = self.registry.open_session();
        let mut disposer = Disposer::new(Arc::clone(&self.registry));
        let mut seen: HashSet<String> = HashSet::with_capacity(candidates.len());
        let mut pages = Vec::with_capacity(candidates.len());
        let mut failures = 0usize;

        for Candidate { entry, kind } in candidates {
            if seen.contains(entry.name()) {
                debug!(target: "materialize", entry = entry.name(), "skipping duplicate entry");
                continue;
            }

            let bytes = match entry.read() {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!(target: "materialize", %session, "{err}");
                    failures += 1;
                    self.record_entry(false);
                    continue;
                }
            };

            let name = entry.name().to_string();
            let dimensions = if self.probe { probe_dimensions(&name, &bytes) } else { None };
            let handle = self.registry.acquire(session, pages.len(), kind, Arc::clone(&bytes));
            disposer.track(handle.clone());
            seen.insert(name.clone());
            self.record_entry(true);

            pages.push(Page {
                name,
                content_kind: kind,
                resource_handle: handle,
                size_bytes: bytes.len(),
                dimensions,
            });
        }

        info!(target: "materialize", %session, pages = pages.len(), failures, "materialized pages");
        PageSession { id: session, pages, disposer }
    }

    fn record_entry(&self, materialized: bool) {
        if let Some(stats) = &self.stats {
            stats.record_entry(materialized);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{EntryClassifier, EntryInfo, EntryReader, OpenedArchive};
    use crate::types::{ArchiveFormat, ContentKind};

    /// In-memory backend; `None` content makes the read fail.
    #[derive(Debug)]
    struct FakeReader {
        contents: Vec<Option<Vec<u8>>>,
    }

    impl EntryReader for FakeReader {
        fn read(&self, index: usize) -> crate::Result<Vec<u8>> {
            self.contents
                .get(index)
                .cloned()
                .flatten()
                .ok_or_else(|| anyhow::anyhow!("invalid deflate stream"))
        }
    }

    fn candidates(items: &[(&str, Option<&str>)]) -> Vec<Candidate> {
        let infos = items
            .iter()
            .enumerate()
            .map(|(index, (name, _))| EntryInfo { name: name.to_string(), is_dir: false, index })
            .collect();
        let contents = items.iter().map(|(_, data)| data.map(|s| s.as_bytes().to_vec())).collect();
        let reader = FakeReader { contents };
        let archive = OpenedArchive::from_reader(ArchiveFormat::Zip, infos, Arc::new(reader));
        EntryClassifier::default().classify(archive.into_entries())
    }

    fn names(session: &PageSession) -> Vec<&str> {
        session.pages().iter().map(|page| page.name.as_str()).collect()
    }

    #[test]
    fn keeps_natural_order_and_kinds() {
        let registry = Arc::new(ResourceRegistry::new());
        let session = Materializer::new(Arc::clone(&registry)).materialize(candidates(&[
            ("page10.jpg", Some("10")),
            ("page2.png", Some("2")),
            ("page1.gif", Some("1")),
        ]));

        assert_eq!(names(&session), vec!["page1.gif", "page2.png", "page10.jpg"]);
        let kinds: Vec<ContentKind> = session.pages().iter().map(|p| p.content_kind).collect();
        assert_eq!(kinds, vec![ContentKind::Gif, ContentKind::Png, ContentKind::Jpeg]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn duplicate_names_keep_first_occurrence() {
        let registry = Arc::new(ResourceRegistry::new());
        let session = Materializer::new(Arc::clone(&registry)).materialize(candidates(&[
            ("001.jpg", Some("first")),
            ("002.jpg", Some("other")),
            ("001.jpg", Some("second")),
        ]));

        assert_eq!(names(&session), vec!["001.jpg", "002.jpg"]);
        let resource = registry.resolve(&session.pages()[0].resource_handle).unwrap();
        assert_eq!(&*resource.bytes, b"first");
    }

    #[test]
    fn unreadable_duplicate_yields_to_next_occurrence() {
        let registry = Arc::new(ResourceRegistry::new());
        let session = Materializer::new(Arc::clone(&registry))
            .materialize(candidates(&[("001.jpg", None), ("001.jpg", Some("backup"))]));

        assert_eq!(names(&session), vec!["001.jpg"]);
        let resource = registry.resolve(&session.pages()[0].resource_handle).unwrap();
        assert_eq!(&*resource.bytes, b"backup");
    }

    #[test]
    fn read_failures_drop_only_that_entry() {
        let registry = Arc::new(ResourceRegistry::new());
        let stats = Arc::new(StatsCollector::new());
        let session = Materializer::new(Arc::clone(&registry))
            .with_stats(Arc::clone(&stats))
            .materialize(candidates(&[
                ("1.jpg", Some("one")),
                ("2.jpg", None),
                ("3.jpg", Some("three")),
            ]));

        assert_eq!(names(&session), vec!["1.jpg", "3.jpg"]);
        let snap = stats.snapshot();
        assert_eq!(snap.entries_materialized, 2);
        assert_eq!(snap.entry_failures, 1);
    }

    #[test]
    fn handles_resolve_identically_and_release_with_session() {
        let registry = Arc::new(ResourceRegistry::new());
        let mut session = Materializer::new(Arc::clone(&registry))
            .with_probe(false)
            .materialize(candidates(&[("a.webp", Some("webp-bytes"))]));

        let page = session.pages()[0].clone();
        assert_eq!(page.size_bytes, 10);
        assert_eq!(page.dimensions, None);
        let first = registry.resolve(&page.resource_handle).unwrap();
        let second = registry.resolve(&page.resource_handle).unwrap();
        assert_eq!(first.bytes, second.bytes);

        assert_eq!(session.release(), 1);
        assert!(registry.resolve(&page.resource_handle).is_none());
        drop(session);
        assert!(registry.is_empty());
    }

    #[test]
    fn no_candidates_is_an_empty_session() {
        let registry = Arc::new(ResourceRegistry::new());
        let session = Materializer::new(registry).materialize(Vec::new());
        assert!(session.is_empty());
    }
}
