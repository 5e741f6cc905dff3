//! Fixed-size pagination over an immutable list, plus the link strip shown above it.

use std::num::NonZeroUsize;

use serde::Serialize;

use crate::config::ViewerConfig;

/// One control in the pagination strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PageLink {
    Previous { target: usize, enabled: bool },
    Page { number: usize, active: bool },
    Ellipsis,
    Next { target: usize, enabled: bool },
}

/// Splits `items` into screens of `page_size` and tracks the current screen (1-based).
#[derive(Debug, Clone)]
pub struct Paginator<T> {
    items: Vec<T>,
    page_size: NonZeroUsize,
    current: usize,
}

impl<T> Paginator<T> {
    pub fn new(items: Vec<T>, page_size: NonZeroUsize) -> Self {
        Self { items, page_size, current: 1 }
    }

    /// Paginate a related-comics listing with the configured gallery size.
    pub fn gallery(items: Vec<T>, config: &ViewerConfig) -> crate::Result<Self> {
        Ok(Self::new(items, config.gallery_page_size()?))
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn page_size(&self) -> usize {
        self.page_size.get()
    }

    pub fn current(&self) -> usize {
        self.current
    }

    /// `ceil(len / page_size)`; zero for an empty list.
    pub fn total_pages(&self) -> usize {
        self.items.len().div_ceil(self.page_size.get())
    }

    /// Number of screens to present: an empty list still shows one (empty) screen.
    pub fn display_pages(&self) -> usize {
        self.total_pages().max(1)
    }

    /// Jump to screen `page`. Out-of-range requests leave the state untouched and return
    /// `false`; `true` means the viewer should scroll back to its top.
    pub fn go_to(&mut self, page: usize) -> bool {
        if page < 1 || page > self.total_pages() {
            return false;
        }
        self.current = page;
        true
    }

    pub fn first(&mut self) -> bool {
        self.go_to(1)
    }

    pub fn previous(&mut self) -> bool {
        self.current.checked_sub(1).is_some_and(|page| self.go_to(page))
    }

    pub fn next(&mut self) -> bool {
        self.go_to(self.current + 1)
    }

    pub fn last(&mut self) -> bool {
        self.go_to(self.total_pages())
    }

    /// Items on the current screen.
    pub fn visible(&self) -> &[T] {
        let size = self.page_size.get();
        let end = (self.current * size).min(self.items.len());
        let start = ((self.current - 1) * size).min(end);
        &self.items[start..end]
    }

    /// Link strip: previous, first, an optional leading ellipsis, the neighbours of the current
    /// screen, an optional trailing ellipsis, last, next.
    pub fn links(&self) -> Vec<PageLink> {
        let current = self.current;
        let total = self.total_pages();
        let mut links = Vec::with_capacity(9);

        links.push(PageLink::Previous { target: current.saturating_sub(1), enabled: current > 1 });
        links.push(PageLink::Page { number: 1, active: current == 1 });

        if current > 4 {
            links.push(PageLink::Ellipsis);
        }

        for number in [current - 1, current, current + 1] {
            if number > 1 && number < total {
                links.push(PageLink::Page { number, active: number == current });
            }
        }

        if current + 3 < total {
            links.push(PageLink::Ellipsis);
        }

        if total > 1 {
            links.push(PageLink::Page { number: total, active: current == total });
        }

        links.push(PageLink::Next { target: current + 1, enabled: current < total });
        links
    }
}
