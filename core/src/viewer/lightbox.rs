//! Zoom/lightbox binding for the visible screen of pages.

use crate::types::{Page, ResourceHandle};

/// A zoomable gallery widget owned by the presentation layer.
pub trait ZoomWidget {
    /// Attach the widget to the given resources, in display order.
    fn bind(&mut self, handles: &[ResourceHandle]);

    /// Detach from whatever is currently bound.
    fn destroy(&mut self);
}

/// Keeps exactly one live widget binding, rebuilt only when the visible handle set changes.
#[derive(Debug)]
pub struct Lightbox<W> {
    widget: W,
    bound: Option<Vec<ResourceHandle>>,
    inits: u64,
}

impl<W: ZoomWidget> Lightbox<W> {
    pub fn new(widget: W) -> Self {
        Self { widget, bound: None, inits: 0 }
    }

    pub fn widget(&self) -> &W {
        &self.widget
    }

    /// Number of times the widget has been bound.
    pub fn inits(&self) -> u64 {
        self.inits
    }

    /// Rebind to `visible` if it differs from the current binding. Returns whether a rebind
    /// happened.
    pub fn sync(&mut self, visible: &[Page]) -> bool {
        let handles: Vec<ResourceHandle> =
            visible.iter().map(|page| page.resource_handle.clone()).collect();
        if self.bound.as_deref().unwrap_or(&[]) == handles.as_slice() {
            return false;
        }

        self.teardown();
        if !handles.is_empty() {
            self.widget.bind(&handles);
            self.inits += 1;
            self.bound = Some(handles);
        }
        true
    }

    /// Detach the widget, e.g. when the view unmounts.
    pub fn teardown(&mut self) {
        if self.bound.take().is_some() {
            self.widget.destroy();
        }
    }
}
