//! Property-based tests for the model cache
//!
//! Random request sequences are replayed against the cache and against a
//! straightforward reference model of least-recently-used eviction. Leases
//! are dropped right away, so every request is satisfiable and the cache
//! must never exceed capacity.

mod common;

use std::collections::{HashMap, HashSet};

use proptest::prelude::*;

use drover_core::{cache::ModelCache, config::CacheConfig};

use common::RecordingLoader;

const ALPHABET: &[&str] = &["a", "b", "c", "d", "e", "f", "g"];

prop_compose! {
    fn arb_request(max_len: usize)(
        picks in prop::collection::vec(0..ALPHABET.len(), 1..=max_len)
    ) -> Vec<String> {
        picks.into_iter().map(|i| ALPHABET[i].to_string()).collect()
    }
}

prop_compose! {
    fn arb_workload()(capacity in 1usize..=5)(
        requests in prop::collection::vec(arb_request(capacity), 1..40),
        capacity in Just(capacity)
    ) -> (usize, Vec<Vec<String>>) {
        (capacity, requests)
    }
}

/// Reference LRU: identifier -> tick of last access
#[derive(Default)]
struct ReferenceLru {
    resident: HashMap<String, u64>,
    tick: u64,
}

impl ReferenceLru {
    /// Apply one request and return the identifiers it evicts, oldest first
    fn apply(&mut self, request: &[String], capacity: usize) -> Vec<String> {
        self.tick += 1;
        let mut seen = HashSet::new();
        let requested: Vec<&String> = request.iter().filter(|id| seen.insert(*id)).collect();
        let missing: Vec<&String> = requested
            .iter()
            .copied()
            .filter(|id| !self.resident.contains_key(*id))
            .collect();

        let mut evicted = Vec::new();
        if !missing.is_empty() {
            let excess = (self.resident.len() + missing.len()).saturating_sub(capacity);
            let mut candidates: Vec<(u64, String)> = self
                .resident
                .iter()
                .filter(|(id, _)| !seen.contains(id))
                .map(|(id, tick)| (*tick, id.clone()))
                .collect();
            candidates.sort();
            for (_, id) in candidates.into_iter().take(excess) {
                self.resident.remove(&id);
                evicted.push(id);
            }
        }

        for id in requested {
            self.resident.insert(id.clone(), self.tick);
        }
        evicted
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    /// The cache evicts exactly what a reference LRU evicts and never
    /// holds more than `capacity` models after a request completes
    #[test]
    fn test_matches_reference_lru((capacity, requests) in arb_workload()) {
        let rt = runtime();
        rt.block_on(async {
            let loader = RecordingLoader::new();
            let cache = ModelCache::new(CacheConfig::with_capacity(capacity), loader.clone()).unwrap();
            let mut reference = ReferenceLru::default();

            for request in &requests {
                let unloads_before = loader.unloads().len();
                let lease = cache.ensure_loaded(request.as_slice()).await.unwrap();
                drop(lease);

                let expected = reference.apply(request, capacity);
                let actual = loader.unloads()[unloads_before..].to_vec();
                prop_assert_eq!(actual, expected);

                prop_assert!(cache.resident_count() <= capacity);
                for id in request {
                    prop_assert!(cache.contains(id).await);
                }
            }
            Ok(())
        })?;
    }

    /// Requests over the ceiling are refused and change nothing
    #[test]
    fn test_oversized_requests_are_noops(
        capacity in 1usize..=4,
        warmup in arb_request(4),
        extra in 1usize..=3
    ) {
        let rt = runtime();
        rt.block_on(async {
            let loader = RecordingLoader::new();
            let cache = ModelCache::new(CacheConfig::with_capacity(capacity), loader.clone()).unwrap();

            let warmup: Vec<String> = warmup.into_iter().take(capacity).collect();
            drop(cache.ensure_loaded(warmup.as_slice()).await.unwrap());
            let before: Vec<String> = cache.snapshot().await.into_iter().map(|m| m.id).collect();
            let loads_before = loader.loads().len();

            let oversized: Vec<String> = (0..capacity + extra).map(|i| format!("x{}", i)).collect();
            let err = cache.ensure_loaded(oversized.as_slice()).await.unwrap_err();
            prop_assert_eq!(err.code(), "CACHE_TOO_MANY_MODELS");

            let after: Vec<String> = cache.snapshot().await.into_iter().map(|m| m.id).collect();
            prop_assert_eq!(before, after);
            prop_assert_eq!(loader.loads().len(), loads_before);
            Ok(())
        })?;
    }
}
