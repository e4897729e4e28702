//! Resident models and their recency order, kept in lockstep.

use std::collections::HashMap;

use super::{
    entry::ModelEntry,
    recency::{RecencyClock, RecencyIndex, Stamp},
};

/// Everything the cache mutates under its lock
#[derive(Debug, Default)]
pub struct CacheState {
    resident: HashMap<String, ModelEntry>,
    recency: RecencyIndex,
    clock: RecencyClock,
}

impl CacheState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp for the request currently holding the state
    pub fn next_stamp(&mut self) -> Stamp {
        self.clock.advance()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.resident.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&ModelEntry> {
        self.resident.get(id)
    }

    pub fn len(&self) -> usize {
        self.resident.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resident.is_empty()
    }

    /// Add a freshly loaded entry, replacing any entry with the same id
    pub fn insert(&mut self, entry: ModelEntry) -> Option<ModelEntry> {
        let replaced = self.remove(entry.id());
        self.recency.insert(entry.last_accessed(), entry.id());
        self.resident.insert(entry.id().to_string(), entry);
        replaced
    }

    pub fn remove(&mut self, id: &str) -> Option<ModelEntry> {
        let entry = self.resident.remove(id)?;
        self.recency.remove(entry.last_accessed(), id);
        Some(entry)
    }

    /// Record an access to `id` at `stamp`. Returns false if `id` is not resident.
    pub fn touch(&mut self, id: &str, stamp: Stamp) -> bool {
        let Some(entry) = self.resident.get_mut(id) else {
            return false;
        };
        let previous = entry.last_accessed();
        entry.touch(stamp);
        self.recency.touch(previous, entry.last_accessed(), id);
        true
    }

    /// Resident entries from least to most recently used, ties by identifier
    pub fn oldest_first(&self) -> impl Iterator<Item = &ModelEntry> + '_ {
        self.recency
            .oldest_first()
            .filter_map(|id| self.resident.get(id))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        model::{Model, ModelHandle, ModelKind},
        Result,
    };
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::Arc;

    pub(crate) struct StubModel(pub String);

    #[async_trait]
    impl Model for StubModel {
        fn id(&self) -> &str {
            &self.0
        }

        fn kind(&self) -> ModelKind {
            ModelKind::Detection
        }

        async fn infer(&self, input: &Value) -> Result<Value> {
            Ok(input.clone())
        }
    }

    pub(crate) fn stub(id: &str) -> ModelHandle {
        Arc::new(StubModel(id.to_string()))
    }

    /// State holding `ids`, each loaded by its own request in the given order
    pub(crate) fn state_with(ids: &[&str]) -> CacheState {
        let mut state = CacheState::new();
        for id in ids {
            let stamp = state.next_stamp();
            state.insert(ModelEntry::new(*id, stub(id), stamp));
        }
        state
    }

    fn order(state: &CacheState) -> Vec<&str> {
        state.oldest_first().map(ModelEntry::id).collect()
    }

    #[test]
    fn test_insert_and_remove_keep_index_in_sync() {
        let mut state = state_with(&["a", "b", "c"]);
        assert_eq!(state.len(), 3);
        assert_eq!(order(&state), vec!["a", "b", "c"]);

        let removed = state.remove("b").unwrap();
        assert_eq!(removed.id(), "b");
        assert!(!state.contains("b"));
        assert_eq!(order(&state), vec!["a", "c"]);
        assert!(state.remove("b").is_none());
    }

    #[test]
    fn test_touch_updates_order_and_count() {
        let mut state = state_with(&["a", "b"]);
        let stamp = state.next_stamp();
        assert!(state.touch("a", stamp));
        assert!(!state.touch("missing", stamp));

        assert_eq!(order(&state), vec!["b", "a"]);
        let entry = state.get("a").unwrap();
        assert_eq!(entry.last_accessed(), stamp);
        assert_eq!(entry.access_count(), 2);
    }

    #[test]
    fn test_stale_touch_does_not_rewind() {
        let mut state = state_with(&["a"]);
        let current = state.get("a").unwrap().last_accessed();
        let mut old = current;
        old.tick = 0;

        state.touch("a", old);
        assert_eq!(state.get("a").unwrap().last_accessed(), current);
        assert_eq!(order(&state), vec!["a"]);
    }

    #[test]
    fn test_reinsert_replaces_entry() {
        let mut state = state_with(&["a"]);
        let stamp = state.next_stamp();
        let replaced = state.insert(ModelEntry::new("a", stub("a"), stamp));
        assert!(replaced.is_some());
        assert_eq!(state.len(), 1);
        assert_eq!(order(&state), vec!["a"]);
    }
}
