//! Where archive bytes come from.

mod directory;

pub use directory::DirectoryFetcher;

use std::sync::Arc;

use async_trait::async_trait;

/// Supplies the raw archive bytes for a comic title.
///
/// Titles are opaque to the core; resolving a human title to a byte source is the fetcher's job.
#[async_trait]
pub trait ArchiveFetcher: Send + Sync {
    async fn fetch(&self, title: &str) -> crate::Result<Vec<u8>>;
}

#[async_trait]
impl<F: ArchiveFetcher + ?Sized> ArchiveFetcher for Arc<F> {
    async fn fetch(&self, title: &str) -> crate::Result<Vec<u8>> {
        (**self).fetch(title).await
    }
}
