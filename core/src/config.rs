//! Viewer configuration.

use std::num::NonZeroUsize;
use std::path::Path;

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};

use crate::archive::classify::DEFAULT_BLOCKED_EXTENSIONS;
use crate::archive::loader::DEFAULT_ARCHIVE_EXTENSIONS;

/// Screen size of the full comic viewer.
pub const VIEWER_PAGE_SIZE: usize = 40;
/// Screen size of the related-comics gallery listing.
pub const GALLERY_PAGE_SIZE: usize = 24;

/// Tunables for loading and presenting archives. Every field has a default, so a config file
/// only needs to name what it overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewerConfig {
    /// Pages per screen in the comic viewer.
    pub page_size: usize,
    /// Items per screen in the gallery listing.
    pub gallery_page_size: usize,
    /// Title extensions opened as ZIP containers.
    pub archive_extensions: Vec<String>,
    /// Entry extensions that are never pages.
    pub blocked_extensions: Vec<String>,
    /// Read image headers so pages carry their dimensions.
    pub probe_dimensions: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            page_size: VIEWER_PAGE_SIZE,
            gallery_page_size: GALLERY_PAGE_SIZE,
            archive_extensions: DEFAULT_ARCHIVE_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            blocked_extensions: DEFAULT_BLOCKED_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            probe_dimensions: true,
        }
    }
}

impl ViewerConfig {
    /// Parse a JSON document and validate it.
    pub fn from_json_str(input: &str) -> crate::Result<Self> {
        let config: Self = serde_json::from_str(input).context("parsing viewer config")?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a JSON config file.
    pub fn load(path: &Path) -> crate::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading viewer config at {}", path.display()))?;
        Self::from_json_str(&raw)
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_gallery_page_size(mut self, gallery_page_size: usize) -> Self {
        self.gallery_page_size = gallery_page_size;
        self
    }

    pub fn with_probe_dimensions(mut self, probe: bool) -> Self {
        self.probe_dimensions = probe;
        self
    }

    pub fn validate(&self) -> crate::Result<()> {
        self.viewer_page_size()?;
        self.gallery_page_size()?;
        if self.archive_extensions.is_empty() {
            return Err(anyhow!("at least one archive extension must be configured"));
        }
        Ok(())
    }

    pub fn viewer_page_size(&self) -> crate::Result<NonZeroUsize> {
        NonZeroUsize::new(self.page_size).ok_or_else(|| anyhow!("pageSize must be positive"))
    }

    pub fn gallery_page_size(&self) -> crate::Result<NonZeroUsize> {
        NonZeroUsize::new(self.gallery_page_size)
            .ok_or_else(|| anyhow!("galleryPageSize must be positive"))
    }
}
