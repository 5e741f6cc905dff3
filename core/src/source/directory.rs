//! Archive fetcher backed by a local library directory.

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use tracing::debug;

use super::ArchiveFetcher;

/// Resolves titles to files below `root`. Titles that would escape the root are refused.
#[derive(Debug, Clone)]
pub struct DirectoryFetcher {
    root: PathBuf,
}

impl DirectoryFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, title: &str) -> crate::Result<PathBuf> {
        let relative = sanitize_title(Path::new(title))
            .ok_or_else(|| anyhow!("title {title:?} does not name a file in the library"))?;
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ArchiveFetcher for DirectoryFetcher {
    async fn fetch(&self, title: &str) -> crate::Result<Vec<u8>> {
        let path = self.resolve(title)?;
        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("reading archive {}", path.display()))?;
        debug!(
            target: "source::directory",
            path = %path.display(),
            bytes = bytes.len(),
            "fetched archive"
        );
        Ok(bytes)
    }
}

fn sanitize_title(path: &Path) -> Option<PathBuf> {
    let mut clean = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::Prefix(_) | Component::RootDir => return None,
        }
    }

    if clean.as_os_str().is_empty() { None } else { Some(clean) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_rejects_escapes() {
        assert_eq!(sanitize_title(Path::new("a/b.cbz")), Some(PathBuf::from("a/b.cbz")));
        assert_eq!(sanitize_title(Path::new("./b.cbz")), Some(PathBuf::from("b.cbz")));
        assert_eq!(sanitize_title(Path::new("../b.cbz")), None);
        assert_eq!(sanitize_title(Path::new("/etc/passwd")), None);
        assert_eq!(sanitize_title(Path::new("")), None);
    }

    #[tokio::test]
    async fn reads_titles_below_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Issue 1.cbz"), b"PK-bytes").unwrap();

        let fetcher = DirectoryFetcher::new(dir.path());
        assert_eq!(fetcher.fetch("Issue 1.cbz").await.unwrap(), b"PK-bytes");

        let err = fetcher.fetch("Issue 2.cbz").await.unwrap_err();
        assert!(format!("{err:#}").contains("Issue 2.cbz"));
        assert!(fetcher.fetch("../Issue 1.cbz").await.is_err());
    }
}
