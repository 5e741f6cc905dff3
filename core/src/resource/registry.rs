//! Session-scoped store of materialized page bytes, addressed by [`ResourceHandle`].

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::trace;

use crate::types::{ContentKind, ResourceHandle, SessionId};

/// Bytes behind a handle, with the kind they should be rendered as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub bytes: Arc<[u8]>,
    pub kind: ContentKind,
}

impl Resource {
    fn cost(&self) -> usize {
        self.bytes.len()
    }
}

#[derive(Debug, Default)]
struct RegistryInner {
    entries: HashMap<ResourceHandle, Resource>,
    bytes_used: usize,
}

/// Holds every live resource across sessions.
///
/// Nothing is evicted implicitly: a handle stays resolvable until it is released, which keeps
/// the pages of a session valid for as long as that session is shown.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    inner: Mutex<RegistryInner>,
    next_session: AtomicU64,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh session id; handles from different sessions never collide.
    pub fn open_session(&self) -> SessionId {
        SessionId::new(self.next_session.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Register `bytes` as the `index`-th resource of `session`.
    pub fn acquire(
        &self,
        session: SessionId,
        index: usize,
        kind: ContentKind,
        bytes: Arc<[u8]>,
    ) -> ResourceHandle {
        let handle = ResourceHandle::new(session, index);
        let resource = Resource { bytes, kind };
        let mut inner = self.inner.lock();
        inner.bytes_used += resource.cost();
        if let Some(previous) = inner.entries.insert(handle.clone(), resource) {
            inner.bytes_used = inner.bytes_used.saturating_sub(previous.cost());
        }
        handle
    }

    /// Look up the bytes behind a handle. Released handles resolve to `None`.
    pub fn resolve(&self, handle: &ResourceHandle) -> Option<Resource> {
        self.inner.lock().entries.get(handle).cloned()
    }

    /// Drop the resource behind `handle`, returning whether it was still live.
    pub fn release(&self, handle: &ResourceHandle) -> bool {
        let mut inner = self.inner.lock();
        match inner.entries.remove(handle) {
            Some(resource) => {
                inner.bytes_used = inner.bytes_used.saturating_sub(resource.cost());
                trace!(target: "resource", handle = %handle, "released resource");
                true
            }
            None => false,
        }
    }

    /// Number of live handles.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total bytes held by live handles.
    pub fn bytes_used(&self) -> usize {
        self.inner.lock().bytes_used
    }
}

/// Explicit disposer list for the handles acquired by one session.
///
/// Dropping the disposer releases everything it still tracks, so a session torn down on an
/// error or cancellation path does not leave resources behind.
#[derive(Debug)]
pub struct Disposer {
    registry: Arc<ResourceRegistry>,
    handles: Vec<ResourceHandle>,
}

impl Disposer {
    pub fn new(registry: Arc<ResourceRegistry>) -> Self {
        Self { registry, handles: Vec::new() }
    }

    pub fn track(&mut self, handle: ResourceHandle) {
        self.handles.push(handle);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Release every tracked handle. Safe to call more than once.
    pub fn release(&mut self) -> usize {
        let released =
            self.handles.drain(..).filter(|handle| self.registry.release(handle)).count();
        if released > 0 {
            trace!(target: "resource", released, "disposed session resources");
        }
        released
    }
}

impl Drop for Disposer {
    fn drop(&mut self) {
        self.release();
    }
}
