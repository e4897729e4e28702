//! Request-scoped access to resident models.
//!
//! A [`ModelLease`] is what `ensure_loaded` hands back. It borrows every model
//! the request named and pins their cache entries, so no other request can
//! evict them while inference is running. Dropping the lease releases the
//! pins and wakes requests waiting for room.

use std::{
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use tokio::sync::Notify;

use crate::model::{Model, ModelHandle};

/// One pin on a cache entry, released on drop.
///
/// Releasing the last pin on an entry signals `unpinned`.
pub(crate) struct PinGuard {
    pins: Arc<AtomicUsize>,
    unpinned: Arc<Notify>,
}

impl PinGuard {
    pub(crate) fn acquire(pins: Arc<AtomicUsize>, unpinned: Arc<Notify>) -> Self {
        pins.fetch_add(1, Ordering::AcqRel);
        Self { pins, unpinned }
    }
}

impl Drop for PinGuard {
    fn drop(&mut self) {
        if self.pins.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.unpinned.notify_waiters();
        }
    }
}

struct LeasedModel {
    id: String,
    handle: ModelHandle,
    _pin: PinGuard,
}

/// Models resident for the duration of one request
pub struct ModelLease {
    models: Vec<LeasedModel>,
}

impl ModelLease {
    pub(crate) fn new() -> Self {
        Self { models: Vec::new() }
    }

    pub(crate) fn push(&mut self, id: &str, handle: ModelHandle, pin: PinGuard) {
        self.models.push(LeasedModel {
            id: id.to_string(),
            handle,
            _pin: pin,
        });
    }

    /// Borrow a leased model by identifier
    pub fn get(&self, id: &str) -> Option<&dyn Model> {
        self.models
            .iter()
            .find(|model| model.id == id)
            .map(|model| model.handle.as_ref())
    }

    /// Leased identifiers in request order
    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.models.iter().map(|model| model.id.as_str())
    }

    /// Leased models in request order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &dyn Model)> + '_ {
        self.models
            .iter()
            .map(|model| (model.id.as_str(), model.handle.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl fmt::Debug for ModelLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.ids()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    #[test]
    fn test_pin_guard_counts() {
        let pins = Arc::new(AtomicUsize::new(0));
        let unpinned = Arc::new(Notify::new());
        let first = PinGuard::acquire(Arc::clone(&pins), Arc::clone(&unpinned));
        let second = PinGuard::acquire(Arc::clone(&pins), Arc::clone(&unpinned));
        assert_eq!(pins.load(Ordering::Acquire), 2);

        drop(first);
        assert_eq!(pins.load(Ordering::Acquire), 1);
        drop(second);
        assert_eq!(pins.load(Ordering::Acquire), 0);
    }

    #[tokio::test]
    async fn test_last_release_wakes_waiters() {
        let pins = Arc::new(AtomicUsize::new(0));
        let unpinned = Arc::new(Notify::new());
        let first = PinGuard::acquire(Arc::clone(&pins), Arc::clone(&unpinned));
        let second = PinGuard::acquire(Arc::clone(&pins), Arc::clone(&unpinned));

        let released = unpinned.notified();
        tokio::pin!(released);
        released.as_mut().enable();

        drop(first);
        assert!(
            tokio::time::timeout(Duration::from_millis(20), released.as_mut())
                .await
                .is_err(),
            "entry is still pinned"
        );

        drop(second);
        tokio::time::timeout(Duration::from_millis(200), released)
            .await
            .unwrap();
    }
}
