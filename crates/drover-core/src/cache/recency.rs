//! Recency tracking.
//!
//! Every request gets one [`Stamp`] from the cache's [`RecencyClock`]. All
//! models touched by that request share it, so "oldest" is decided by the
//! logical tick and then by identifier.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Point in the cache's access history
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Stamp {
    /// Strictly increasing per request
    pub tick: u64,
    /// Wall-clock time of the request, for reporting
    pub at: DateTime<Utc>,
}

/// Hands out strictly increasing stamps
#[derive(Debug, Default)]
pub struct RecencyClock {
    last_tick: u64,
}

impl RecencyClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp for a new request
    pub fn advance(&mut self) -> Stamp {
        self.last_tick += 1;
        Stamp {
            tick: self.last_tick,
            at: Utc::now(),
        }
    }
}

/// Resident identifiers ordered by (stamp, identifier)
#[derive(Debug, Default)]
pub struct RecencyIndex {
    order: BTreeSet<(Stamp, String)>,
}

impl RecencyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, stamp: Stamp, id: &str) {
        self.order.insert((stamp, id.to_string()));
    }

    pub fn remove(&mut self, stamp: Stamp, id: &str) -> bool {
        self.order.remove(&(stamp, id.to_string()))
    }

    /// Move `id` from `old` to `new`
    pub fn touch(&mut self, old: Stamp, new: Stamp, id: &str) {
        let key = (old, id.to_string());
        if self.order.remove(&key) {
            self.order.insert((new, key.1));
        }
    }

    /// Identifiers from least to most recently used
    pub fn oldest_first(&self) -> impl Iterator<Item = &str> + '_ {
        self.order.iter().map(|(_, id)| id.as_str())
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
