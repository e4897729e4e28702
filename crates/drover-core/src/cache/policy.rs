//! Load/evict decision for a single request.
//!
//! Planning is pure: it reads the state and says what to do. The manager
//! carries the plan out.

use std::collections::HashSet;

use super::state::CacheState;

/// What one request needs done to the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionPlan {
    /// Requested ids already resident, request order
    pub already_resident: Vec<String>,
    /// Requested ids to load, request order
    pub missing: Vec<String>,
    /// Residents to evict, least recently used first
    pub evict: Vec<String>,
    /// Slots the request's own residents leave unavailable. Only possible
    /// when the cache already holds more than `capacity` entries.
    pub over_capacity: usize,
    /// Slots held by residents other requests have pinned
    pub blocked_by_pins: usize,
}

impl AdmissionPlan {
    /// Plan admission of `requested` into `state` under `capacity`.
    ///
    /// `requested` must already be free of duplicates. When everything is
    /// resident no eviction is considered. Otherwise the oldest residents
    /// that are neither requested nor pinned by a live lease are chosen.
    pub fn build(requested: &[String], state: &CacheState, capacity: usize) -> Self {
        let (already_resident, missing): (Vec<String>, Vec<String>) = requested
            .iter()
            .cloned()
            .partition(|id| state.contains(id));

        if missing.is_empty() {
            return Self {
                already_resident,
                missing,
                evict: Vec::new(),
                over_capacity: 0,
                blocked_by_pins: 0,
            };
        }

        let projected_total = state.len() + missing.len();
        let number_to_evict = projected_total.saturating_sub(capacity);

        let requested_set: HashSet<&str> = requested.iter().map(String::as_str).collect();
        let evict: Vec<String> = state
            .oldest_first()
            .filter(|entry| !requested_set.contains(entry.id()) && !entry.is_pinned())
            .take(number_to_evict)
            .map(|entry| entry.id().to_string())
            .collect();

        let others = state.len() - already_resident.len();
        let over_capacity = number_to_evict.saturating_sub(others);
        let blocked_by_pins = number_to_evict - over_capacity - evict.len();

        Self {
            already_resident,
            missing,
            evict,
            over_capacity,
            blocked_by_pins,
        }
    }

    /// Slots still missing after every eligible eviction
    pub fn shortfall(&self) -> usize {
        self.over_capacity + self.blocked_by_pins
    }

    /// Nothing to load, so nothing to evict
    pub fn is_fast_path(&self) -> bool {
        self.missing.is_empty()
    }

    /// Resident count once the plan has run
    pub fn resulting_len(&self, current_len: usize) -> usize {
        current_len + self.missing.len() - self.evict.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::state::tests::state_with;
    use std::sync::Arc;
    use tokio::sync::Notify;

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn test_fast_path_when_all_resident() {
        let state = state_with(&["a", "b"]);
        let plan = AdmissionPlan::build(&ids(&["b"]), &state, 2);

        assert!(plan.is_fast_path());
        assert_eq!(plan.already_resident, ids(&["b"]));
        assert!(plan.evict.is_empty());
        assert_eq!(plan.shortfall(), 0);
    }

    #[test]
    fn test_evicts_oldest_to_make_room() {
        let state = state_with(&["a", "b"]);
        let plan = AdmissionPlan::build(&ids(&["c"]), &state, 2);

        assert_eq!(plan.missing, ids(&["c"]));
        assert_eq!(plan.evict, ids(&["a"]));
        assert_eq!(plan.shortfall(), 0);
        assert_eq!(plan.resulting_len(state.len()), 2);
    }

    #[test]
    fn test_no_eviction_with_spare_capacity() {
        let state = state_with(&["a"]);
        let plan = AdmissionPlan::build(&ids(&["b", "c"]), &state, 3);

        assert!(plan.evict.is_empty());
        assert_eq!(plan.missing, ids(&["b", "c"]));
    }

    #[test]
    fn test_requested_residents_are_never_candidates() {
        let state = state_with(&["a", "b", "c"]);
        let plan = AdmissionPlan::build(&ids(&["a", "d"]), &state, 3);

        assert_eq!(plan.already_resident, ids(&["a"]));
        assert_eq!(plan.evict, ids(&["b"]));
    }

    #[test]
    fn test_ties_broken_by_identifier() {
        let mut state = state_with(&["c", "a", "b"]);
        let stamp = state.next_stamp();
        for id in ["c", "a", "b"] {
            state.touch(id, stamp);
        }

        let plan = AdmissionPlan::build(&ids(&["x", "y"]), &state, 3);
        assert_eq!(plan.evict, ids(&["a", "b"]));
    }

    #[test]
    fn test_shortfall_when_residents_are_requested() {
        let state = state_with(&["a", "b"]);
        let plan = AdmissionPlan::build(&ids(&["a", "b", "c"]), &state, 2);

        assert!(plan.evict.is_empty());
        assert_eq!(plan.over_capacity, 1);
        assert_eq!(plan.blocked_by_pins, 0);
        assert_eq!(plan.resulting_len(state.len()), 3);
    }

    #[test]
    fn test_pinned_entries_are_skipped() {
        let state = state_with(&["a", "b", "c"]);
        let unpinned = Arc::new(Notify::new());
        let _pin = state.get("a").unwrap().pin(&unpinned);

        let plan = AdmissionPlan::build(&ids(&["d"]), &state, 3);
        assert_eq!(plan.evict, ids(&["b"]));
        assert_eq!(plan.shortfall(), 0);
    }

    #[test]
    fn test_pins_block_admission() {
        let state = state_with(&["a", "b", "c"]);
        let unpinned = Arc::new(Notify::new());
        let _pins: Vec<_> = ["a", "b"]
            .iter()
            .map(|id| state.get(id).unwrap().pin(&unpinned))
            .collect();

        let plan = AdmissionPlan::build(&ids(&["c", "d", "e"]), &state, 3);
        assert!(plan.evict.is_empty());
        assert_eq!(plan.over_capacity, 0);
        assert_eq!(plan.blocked_by_pins, 2);

        let plan = AdmissionPlan::build(&ids(&["d"]), &state, 3);
        assert_eq!(plan.evict, ids(&["c"]));
        assert_eq!(plan.shortfall(), 0);
    }

    #[test]
    fn test_overfull_cache_splits_shortfall() {
        let state = state_with(&["a", "b", "c", "d"]);
        let unpinned = Arc::new(Notify::new());
        let pin = state.get("c").unwrap().pin(&unpinned);

        // Four residents under capacity 3: two must go, but only "d" is free.
        let plan = AdmissionPlan::build(&ids(&["a", "b", "e"]), &state, 3);
        assert_eq!(plan.evict, ids(&["d"]));
        assert_eq!(plan.over_capacity, 0);
        assert_eq!(plan.blocked_by_pins, 1);

        drop(pin);
        let plan = AdmissionPlan::build(&ids(&["a", "b", "c", "e"]), &state, 3);
        assert_eq!(plan.evict, ids(&["d"]));
        assert_eq!(plan.over_capacity, 1);
        assert_eq!(plan.blocked_by_pins, 0);
    }
}
