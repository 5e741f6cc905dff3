use std::collections::HashMap;
use std::io::{Cursor, Write};

use anyhow::anyhow;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use viewer_core::source::{ArchiveFetcher, DirectoryFetcher};
use viewer_core::viewer::{LoadOutcome, PageLink, PhaseKind, ViewerController};
use viewer_core::{LoadError, ViewerConfig};
use zip::write::FileOptions;

fn archive(names: &[&str]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for name in names {
        zip.start_file(*name, FileOptions::default()).unwrap();
        zip.write_all(name.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

fn config() -> ViewerConfig {
    ViewerConfig::default().with_probe_dimensions(false)
}

/// Fetcher whose responses are released by the test, one title at a time.
#[derive(Debug)]
struct GatedFetcher {
    gates: Mutex<HashMap<String, oneshot::Receiver<Vec<u8>>>>,
    started: mpsc::UnboundedSender<String>,
}

impl GatedFetcher {
    fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (started, rx) = mpsc::unbounded_channel();
        (Self { gates: Mutex::new(HashMap::new()), started }, rx)
    }

    fn gate(&self, title: &str) -> oneshot::Sender<Vec<u8>> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().insert(title.to_string(), rx);
        tx
    }
}

#[async_trait]
impl ArchiveFetcher for GatedFetcher {
    async fn fetch(&self, title: &str) -> viewer_core::Result<Vec<u8>> {
        let gate = self.gates.lock().remove(title).ok_or_else(|| anyhow!("no gate for {title}"))?;
        let _ = self.started.send(title.to_string());
        gate.await.map_err(|_| anyhow!("gate for {title} was dropped"))
    }
}

fn page_names<F: ArchiveFetcher>(viewer: &ViewerController<F>) -> Vec<String> {
    viewer.snapshot().pages.into_iter().map(|page| page.name).collect()
}

#[tokio::test]
async fn newer_request_wins_when_older_fetch_finishes_last() {
    let (fetcher, mut started) = GatedFetcher::new();
    let gate_a = fetcher.gate("a.cbz");
    let gate_b = fetcher.gate("b.cbz");
    let viewer = ViewerController::new(fetcher, config()).unwrap();
    let (go_b, wait_b) = oneshot::channel::<()>();

    let (a, b, ()) = tokio::join!(
        viewer.load_title("a.cbz"),
        async {
            wait_b.await.unwrap();
            viewer.load_title("b.cbz").await
        },
        async {
            assert_eq!(started.recv().await.as_deref(), Some("a.cbz"));
            go_b.send(()).unwrap();
            assert_eq!(started.recv().await.as_deref(), Some("b.cbz"));

            gate_b.send(archive(&["b1.jpg", "b2.jpg"])).unwrap();
            while viewer.phase() != PhaseKind::Ready {
                tokio::task::yield_now().await;
            }
            gate_a.send(archive(&["a1.jpg", "a2.jpg", "a3.jpg"])).unwrap();
        },
    );

    assert_eq!(a, LoadOutcome::Superseded);
    assert_eq!(b, LoadOutcome::Ready { pages: 2 });
    assert_eq!(page_names(&viewer), vec!["b1.jpg", "b2.jpg"]);
    assert_eq!(viewer.snapshot().title.as_deref(), Some("b.cbz"));
    assert_eq!(viewer.registry().len(), 2);
    assert_eq!(viewer.stats().snapshot().loads_superseded, 1);
}

#[tokio::test]
async fn newer_request_wins_when_older_fetch_finishes_first() {
    let (fetcher, mut started) = GatedFetcher::new();
    let gate_a = fetcher.gate("a.cbz");
    let gate_b = fetcher.gate("b.cbz");
    let viewer = ViewerController::new(fetcher, config()).unwrap();
    let (go_b, wait_b) = oneshot::channel::<()>();

    let (a, b, ()) = tokio::join!(
        viewer.load_title("a.cbz"),
        async {
            wait_b.await.unwrap();
            viewer.load_title("b.cbz").await
        },
        async {
            assert_eq!(started.recv().await.as_deref(), Some("a.cbz"));
            go_b.send(()).unwrap();
            assert_eq!(started.recv().await.as_deref(), Some("b.cbz"));

            gate_a.send(archive(&["a1.jpg", "a2.jpg", "a3.jpg"])).unwrap();
            for _ in 0..8 {
                tokio::task::yield_now().await;
            }
            assert_eq!(viewer.phase(), PhaseKind::Loading);
            gate_b.send(archive(&["b1.jpg"])).unwrap();
        },
    );

    assert_eq!(a, LoadOutcome::Superseded);
    assert_eq!(b, LoadOutcome::Ready { pages: 1 });
    assert_eq!(page_names(&viewer), vec!["b1.jpg"]);
    assert_eq!(viewer.registry().len(), 1);
}

#[tokio::test]
async fn request_during_load_shows_loading_without_stale_pages() {
    let (fetcher, mut started) = GatedFetcher::new();
    fetcher.gate("a.cbz").send(archive(&["a1.jpg"])).unwrap();
    let gate_b = fetcher.gate("b.cbz");
    let viewer = ViewerController::new(fetcher, config()).unwrap();

    assert_eq!(viewer.load_title("a.cbz").await, LoadOutcome::Ready { pages: 1 });
    assert_eq!(started.recv().await.as_deref(), Some("a.cbz"));

    let (b, ()) = tokio::join!(viewer.load_title("b.cbz"), async {
        assert_eq!(started.recv().await.as_deref(), Some("b.cbz"));
        let snap = viewer.snapshot();
        assert!(snap.loading);
        assert!(snap.pages.is_empty());
        assert!(snap.error.is_none());
        assert!(viewer.registry().is_empty());
        gate_b.send(archive(&["b1.jpg"])).unwrap();
    });

    assert_eq!(b, LoadOutcome::Ready { pages: 1 });
}

#[tokio::test]
async fn directory_library_end_to_end() {
    let library = tempfile::tempdir().unwrap();
    let names: Vec<String> = (1..=85).map(|i| format!("{i:03}.jpg")).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    std::fs::write(library.path().join("Saga 1.cbz"), archive(&refs)).unwrap();
    std::fs::write(library.path().join("notes.txt.zip"), b"not a zip").unwrap();

    let viewer = ViewerController::new(DirectoryFetcher::new(library.path()), config()).unwrap();

    assert_eq!(viewer.load_title("Saga 1.cbz").await, LoadOutcome::Ready { pages: 85 });
    let snap = viewer.snapshot();
    assert_eq!((snap.total_pages, snap.current_index, snap.page_size), (3, 1, 40));
    assert_eq!(viewer.visible_pages().len(), 40);

    assert!(viewer.go_to_page(2));
    assert!(!viewer.go_to_page(4));
    assert_eq!(viewer.snapshot().current_index, 2);
    assert_eq!(viewer.visible_pages()[0].name, "041.jpg");
    let previous = PageLink::Previous { target: 1, enabled: true };
    assert_eq!(viewer.pagination_links().first(), Some(&previous));

    let handle = viewer.visible_pages()[0].resource_handle.clone();
    assert_eq!(&*viewer.resolve(&handle).unwrap().bytes, b"041.jpg");

    let outcome = viewer.load_title("notes.txt.zip").await;
    assert!(matches!(outcome, LoadOutcome::Failed(LoadError::CorruptArchive(_))));
    assert!(viewer.resolve(&handle).is_none());

    let outcome = viewer.load_title("Saga 2.cbz").await;
    assert!(matches!(outcome, LoadOutcome::Failed(LoadError::Fetch(_))));

    let outcome = viewer.load_title("../Saga 1.cbz").await;
    assert!(matches!(outcome, LoadOutcome::Failed(LoadError::Fetch(_))));
}

#[tokio::test]
async fn unsupported_title_fails_without_fetching() {
    let (fetcher, mut started) = GatedFetcher::new();
    let viewer = ViewerController::new(fetcher, config()).unwrap();

    let outcome = viewer.load_title("Saga 1.rar").await;
    assert_eq!(
        outcome,
        LoadOutcome::Failed(LoadError::UnsupportedFormat { extension: "rar".to_string() })
    );
    assert!(started.try_recv().is_err());

    let snap = viewer.snapshot();
    assert_eq!(snap.phase, PhaseKind::Failed);
    assert!(snap.error.unwrap().contains("rar"));
    assert_eq!(viewer.stats().snapshot().loads_failed, 1);
}
