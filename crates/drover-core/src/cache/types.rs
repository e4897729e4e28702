//! Introspection types for the model cache.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::entry::ModelEntry;
use crate::model::ModelKind;

/// Cache counters since startup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Requested identifiers served from residents
    pub hits: u64,
    /// Load attempts for identifiers that were not resident
    pub misses: u64,
    /// Successful loads
    pub loads: u64,
    /// Failed loads
    pub load_failures: u64,
    /// Entries evicted to make room
    pub evictions: u64,
    /// Requests refused before touching the cache
    pub rejected: u64,
    /// Times a request waited for leased models to be released
    pub pin_waits: u64,
}

/// Point-in-time view of one resident model
#[derive(Debug, Clone, Serialize)]
pub struct ResidentModel {
    pub id: String,
    pub kind: ModelKind,
    pub last_accessed: DateTime<Utc>,
    pub loaded_at: DateTime<Utc>,
    pub access_count: u64,
    pub pinned: bool,
}

impl From<&ModelEntry> for ResidentModel {
    fn from(entry: &ModelEntry) -> Self {
        Self {
            id: entry.id().to_string(),
            kind: entry.handle().kind(),
            last_accessed: entry.last_accessed().at,
            loaded_at: entry.loaded_at(),
            access_count: entry.access_count(),
            pinned: entry.is_pinned(),
        }
    }
}
