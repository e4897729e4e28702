//! A resident model and its bookkeeping.

use chrono::{DateTime, Utc};
use std::{
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};
use tokio::sync::Notify;

use super::{lease::PinGuard, recency::Stamp};
use crate::model::ModelHandle;

/// A model held by the cache
pub struct ModelEntry {
    id: String,
    handle: ModelHandle,
    last_accessed: Stamp,
    loaded_at: DateTime<Utc>,
    access_count: u64,
    /// Live leases holding this entry
    pins: Arc<AtomicUsize>,
}

impl ModelEntry {
    /// Entry for a freshly loaded model, accessed at `stamp`
    pub fn new(id: impl Into<String>, handle: ModelHandle, stamp: Stamp) -> Self {
        Self {
            id: id.into(),
            handle,
            last_accessed: stamp,
            loaded_at: stamp.at,
            access_count: 1,
            pins: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn last_accessed(&self) -> Stamp {
        self.last_accessed
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn access_count(&self) -> u64 {
        self.access_count
    }

    /// Whether a live lease currently holds this entry
    pub fn is_pinned(&self) -> bool {
        self.pins.load(Ordering::Acquire) > 0
    }

    /// Record an access. Stamps never move backwards.
    pub(crate) fn touch(&mut self, stamp: Stamp) {
        if stamp > self.last_accessed {
            self.last_accessed = stamp;
        }
        self.access_count += 1;
    }

    /// Pin this entry. Dropping the guard signals `unpinned` once no pins remain.
    pub(crate) fn pin(&self, unpinned: &Arc<Notify>) -> PinGuard {
        PinGuard::acquire(Arc::clone(&self.pins), Arc::clone(unpinned))
    }

    pub(crate) fn handle(&self) -> &ModelHandle {
        &self.handle
    }

    pub(crate) fn into_handle(self) -> ModelHandle {
        self.handle
    }
}

impl fmt::Debug for ModelEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelEntry")
            .field("id", &self.id)
            .field("kind", &self.handle.kind())
            .field("last_accessed", &self.last_accessed)
            .field("loaded_at", &self.loaded_at)
            .field("access_count", &self.access_count)
            .field("pins", &self.pins.load(Ordering::Relaxed))
            .finish()
    }
}
