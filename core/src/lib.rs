//! Core library for the comic archive viewer: archive loading, page ordering, resource
//! ownership, and the viewer state machine.

#![deny(missing_debug_implementations)]

pub mod archive;
pub mod codec;
pub mod config;
pub mod error;
pub mod log;
pub mod materialize;
pub mod resource;
pub mod source;
pub mod stats;
pub mod types;
pub mod viewer;

pub type Result<T> = std::result::Result<T, anyhow::Error>;

pub use archive::{ArchiveLoader, EntryClassifier, natural_cmp};
pub use config::ViewerConfig;
pub use error::{EntryReadError, LoadError};
pub use materialize::{Materializer, PageSession};
pub use resource::{Resource, ResourceRegistry};
pub use source::{ArchiveFetcher, DirectoryFetcher};
pub use stats::{LoadSnapshot, StatsCollector};
pub use types::{ArchiveFormat, ContentKind, ImageDimensions, Page, ResourceHandle, SessionId};
pub use viewer::{LoadOutcome, PageLink, Paginator, PhaseKind, ViewerController, ViewerSnapshot};

/// Returns the version of the core crate for telemetry and debugging.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exposes_semver_version() {
        assert!(version().contains('.'));
    }

    #[test]
    fn page_serializes_for_the_shell() {
        let page = Page {
            name: "001.png".to_string(),
            content_kind: ContentKind::Png,
            resource_handle: ResourceHandle::new(SessionId::new(3), 0),
            size_bytes: 12,
            dimensions: Some(ImageDimensions { width: 2, height: 1 }),
        };

        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["contentKind"], "png");
        assert_eq!(json["resourceHandle"], "asset://localhost/img/s3-page-0");
        assert_eq!(json["dimensions"]["width"], 2);
    }
}
