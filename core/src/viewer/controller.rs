//! Load state machine and navigation for the comic viewer.
//!
//! A controller owns at most one page session at a time. Every `load_title` call takes a new
//! generation number; a load that resumes after a newer request has started throws its result
//! away (releasing whatever it materialized) instead of overwriting the newer state.

use std::mem;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::archive::{ArchiveLoader, EntryClassifier};
use crate::config::ViewerConfig;
use crate::error::LoadError;
use crate::materialize::{Materializer, PageSession};
use crate::resource::{Disposer, Resource, ResourceRegistry};
use crate::source::ArchiveFetcher;
use crate::stats::{LoadResult, StatsCollector};
use crate::types::{Page, ResourceHandle, SessionId};

use super::paginate::{PageLink, Paginator};

/// Coarse state of the controller, for callers that only need to branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PhaseKind {
    Idle,
    Loading,
    Ready,
    Failed,
}

#[derive(Debug)]
enum ViewerPhase {
    Idle,
    Loading {
        title: String,
    },
    Ready {
        title: String,
        session: SessionId,
        pages: Paginator<Page>,
        disposer: Disposer,
    },
    Failed {
        title: String,
        error: LoadError,
    },
}

impl ViewerPhase {
    fn kind(&self) -> PhaseKind {
        match self {
            ViewerPhase::Idle => PhaseKind::Idle,
            ViewerPhase::Loading { .. } => PhaseKind::Loading,
            ViewerPhase::Ready { .. } => PhaseKind::Ready,
            ViewerPhase::Failed { .. } => PhaseKind::Failed,
        }
    }

    fn title(&self) -> Option<&str> {
        match self {
            ViewerPhase::Idle => None,
            ViewerPhase::Loading { title }
            | ViewerPhase::Ready { title, .. }
            | ViewerPhase::Failed { title, .. } => Some(title),
        }
    }
}

#[derive(Debug)]
struct ControllerState {
    generation: u64,
    phase: ViewerPhase,
}

/// What became of one `load_title` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The page list is live; zero pages is a valid, empty comic.
    Ready { pages: usize },
    /// The archive could not be fetched or opened.
    Failed(LoadError),
    /// A newer request took over before this one finished; its result was discarded.
    Superseded,
}

/// Point-in-time view of the controller for rendering.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerSnapshot {
    pub phase: PhaseKind,
    pub title: Option<String>,
    pub pages: Vec<Page>,
    pub page_size: usize,
    pub current_index: usize,
    pub total_pages: usize,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct ViewerController<F> {
    fetcher: F,
    config: ViewerConfig,
    page_size: NonZeroUsize,
    gallery_page_size: NonZeroUsize,
    loader: ArchiveLoader,
    classifier: EntryClassifier,
    registry: Arc<ResourceRegistry>,
    stats: Arc<StatsCollector>,
    state: Mutex<ControllerState>,
}

impl<F: ArchiveFetcher> ViewerController<F> {
    pub fn new(fetcher: F, config: ViewerConfig) -> crate::Result<Self> {
        config.validate()?;
        let page_size = config.viewer_page_size()?;
        let gallery_page_size = config.gallery_page_size()?;
        Ok(Self {
            fetcher,
            page_size,
            gallery_page_size,
            loader: ArchiveLoader::new(config.archive_extensions.iter().cloned()),
            classifier: EntryClassifier::new(config.blocked_extensions.iter().cloned()),
            config,
            registry: Arc::new(ResourceRegistry::new()),
            stats: Arc::new(StatsCollector::new()),
            state: Mutex::new(ControllerState { generation: 0, phase: ViewerPhase::Idle }),
        })
    }

    /// Share a stats collector with the rest of the shell.
    pub fn with_stats(mut self, stats: Arc<StatsCollector>) -> Self {
        self.stats = stats;
        self
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ResourceRegistry> {
        &self.registry
    }

    pub fn stats(&self) -> &Arc<StatsCollector> {
        &self.stats
    }

    /// Paginator for a related-comics listing, screened at the gallery size.
    pub fn gallery<T>(&self, items: Vec<T>) -> Paginator<T> {
        Paginator::new(items, self.gallery_page_size)
    }

    /// Fetch, open, and materialize `title`, replacing whatever was shown before.
    ///
    /// The previous session is released as soon as the request starts. The current screen resets
    /// to 1 on every rebuild. Titles with an unsupported extension fail without being fetched.
    pub async fn load_title(&self, title: &str) -> LoadOutcome {
        let generation = self.begin(title);
        let started = Instant::now();

        if let Err(error) = self.loader.detect_format(title) {
            return self.commit(generation, title, Err(error), started);
        }

        let fetched = self.fetcher.fetch(title).await;
        if !self.is_current(generation) {
            return self.superseded(title, started);
        }

        let built = match fetched {
            Ok(bytes) => self.build(title, bytes),
            Err(err) => Err(LoadError::Fetch(format!("{err:#}"))),
        };
        self.commit(generation, title, built, started)
    }

    /// Drop the current session and return to `Idle`. Any in-flight load becomes stale.
    pub fn unload(&self) {
        let previous = {
            let mut state = self.state.lock();
            state.generation += 1;
            mem::replace(&mut state.phase, ViewerPhase::Idle)
        };
        retire(previous);
        self.publish_resident();
    }

    pub fn phase(&self) -> PhaseKind {
        self.state.lock().phase.kind()
    }

    /// Jump to screen `n`. Returns `true` when the screen changed and the viewer should scroll
    /// to its top; out-of-range requests and requests outside `Ready` are no-ops.
    pub fn go_to_page(&self, n: usize) -> bool {
        self.navigate(|pages| pages.go_to(n))
    }

    pub fn first_page(&self) -> bool {
        self.navigate(Paginator::first)
    }

    pub fn previous_page(&self) -> bool {
        self.navigate(Paginator::previous)
    }

    pub fn next_page(&self) -> bool {
        self.navigate(Paginator::next)
    }

    pub fn last_page(&self) -> bool {
        self.navigate(Paginator::last)
    }

    /// Pages on the current screen.
    pub fn visible_pages(&self) -> Vec<Page> {
        match &self.state.lock().phase {
            ViewerPhase::Ready { pages, .. } => pages.visible().to_vec(),
            _ => Vec::new(),
        }
    }

    /// Link strip for the current screen; empty unless a page list is live.
    pub fn pagination_links(&self) -> Vec<PageLink> {
        match &self.state.lock().phase {
            ViewerPhase::Ready { pages, .. } => pages.links(),
            _ => Vec::new(),
        }
    }

    /// Bytes and kind behind a page handle, while its session is live.
    pub fn resolve(&self, handle: &ResourceHandle) -> Option<Resource> {
        self.registry.resolve(handle)
    }

    pub fn snapshot(&self) -> ViewerSnapshot {
        let state = self.state.lock();
        let phase = &state.phase;

        let (pages, current_index, total_pages) = match phase {
            ViewerPhase::Ready { pages, .. } => {
                (pages.items().to_vec(), pages.current(), pages.total_pages())
            }
            _ => (Vec::new(), 1, 0),
        };
        let error = match phase {
            ViewerPhase::Failed { error, .. } => Some(error.to_string()),
            _ => None,
        };

        ViewerSnapshot {
            phase: phase.kind(),
            title: phase.title().map(str::to_string),
            pages,
            page_size: self.page_size.get(),
            current_index,
            total_pages,
            loading: phase.kind() == PhaseKind::Loading,
            error,
        }
    }

    fn begin(&self, title: &str) -> u64 {
        let (generation, previous) = {
            let mut state = self.state.lock();
            state.generation += 1;
            let previous =
                mem::replace(&mut state.phase, ViewerPhase::Loading { title: title.to_string() });
            (state.generation, previous)
        };
        retire(previous);

        self.stats.record_load_started();
        self.publish_resident();
        info!(target: "viewer::controller", title, generation, "loading archive");
        generation
    }

    fn is_current(&self, generation: u64) -> bool {
        self.state.lock().generation == generation
    }

    fn build(&self, title: &str, bytes: Vec<u8>) -> Result<PageSession, LoadError> {
        let archive = self.loader.open(title, bytes)?;
        let candidates = self.classifier.classify(archive.into_entries());
        let session = Materializer::new(Arc::clone(&self.registry))
            .with_probe(self.config.probe_dimensions)
            .with_stats(Arc::clone(&self.stats))
            .materialize(candidates);
        Ok(session)
    }

    fn commit(
        &self,
        generation: u64,
        title: &str,
        built: Result<PageSession, LoadError>,
        started: Instant,
    ) -> LoadOutcome {
        let mut state = self.state.lock();
        if state.generation != generation {
            drop(state);
            if let Ok(mut session) = built {
                session.release();
            }
            return self.superseded(title, started);
        }

        let (outcome, next) = match built {
            Ok(session) => {
                let (id, pages, disposer) = session.into_parts();
                let count = pages.len();
                info!(
                    target: "viewer::controller",
                    title,
                    session = %id,
                    pages = count,
                    "archive ready"
                );
                let pages = Paginator::new(pages, self.page_size);
                (
                    LoadOutcome::Ready { pages: count },
                    ViewerPhase::Ready { title: title.to_string(), session: id, pages, disposer },
                )
            }
            Err(error) => {
                warn!(target: "viewer::controller", title, "archive load failed: {error}");
                (
                    LoadOutcome::Failed(error.clone()),
                    ViewerPhase::Failed { title: title.to_string(), error },
                )
            }
        };
        state.phase = next;
        drop(state);

        let result = match outcome {
            LoadOutcome::Ready { .. } => LoadResult::Ready,
            _ => LoadResult::Failed,
        };
        self.stats.record_load_finished(result, started.elapsed());
        self.publish_resident();
        outcome
    }

    fn superseded(&self, title: &str, started: Instant) -> LoadOutcome {
        debug!(target: "viewer::controller", title, "discarding stale load");
        self.stats.record_load_finished(LoadResult::Superseded, started.elapsed());
        self.publish_resident();
        LoadOutcome::Superseded
    }

    fn navigate(&self, step: impl FnOnce(&mut Paginator<Page>) -> bool) -> bool {
        let mut state = self.state.lock();
        let ViewerPhase::Ready { pages, session, .. } = &mut state.phase else {
            return false;
        };
        let moved = step(pages);
        if moved {
            debug!(
                target: "viewer::controller",
                session = %session,
                page = pages.current(),
                "navigated"
            );
        }
        moved
    }

    fn publish_resident(&self) {
        self.stats.update_resident(self.registry.bytes_used(), self.registry.len());
    }
}

/// Release the handles of a session that is no longer shown.
fn retire(phase: ViewerPhase) {
    if let ViewerPhase::Ready { session, mut disposer, .. } = phase {
        let released = disposer.release();
        debug!(target: "viewer::controller", session = %session, released, "released page session");
    }
}
