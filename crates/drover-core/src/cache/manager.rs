//! The model cache.
//!
//! All admission work for a request (planning, eviction, loading, recency
//! updates) runs under one async mutex, so two requests can never race on
//! the resident set, double-load an identifier, or evict something the other
//! just admitted. Loads therefore serialize across the whole cache: a slow
//! load delays every other request that needs the lock, including pure cache
//! hits. Occupancy and counters are readable without the lock.
//!
//! A request that only fits once other requests drop their leases gives the
//! lock up while it waits, then plans again from scratch.

use parking_lot::RwLock;
use std::{
    collections::HashSet,
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};
use tokio::{
    sync::{Mutex, Notify},
    time::{timeout_at, Instant},
};
use tracing::{debug, error, info, warn};

use super::{
    entry::ModelEntry,
    lease::ModelLease,
    policy::AdmissionPlan,
    state::CacheState,
    types::{CacheStats, ResidentModel},
};
use crate::{
    config::{CacheConfig, OverflowPolicy},
    model::{validate_model_id, ModelLoader},
    CoreError, Result,
};

/// Bounded, least-recently-used cache of loaded models
pub struct ModelCache {
    config: CacheConfig,
    loader: Arc<dyn ModelLoader>,
    state: Mutex<CacheState>,
    /// Signalled when an entry loses its last pin
    unpinned: Arc<Notify>,
    /// Mirror of the resident count for lock-free reads
    resident: AtomicUsize,
    stats: RwLock<CacheStats>,
}

impl ModelCache {
    /// Create an empty cache that loads through `loader`
    pub fn new(config: CacheConfig, loader: Arc<dyn ModelLoader>) -> Result<Self> {
        config.validate()?;

        info!(
            capacity = config.capacity,
            overflow = ?config.overflow,
            pin_wait_ms = config.pin_wait_ms,
            "Initializing model cache"
        );

        Ok(Self {
            config,
            loader,
            state: Mutex::new(CacheState::new()),
            unpinned: Arc::new(Notify::new()),
            resident: AtomicUsize::new(0),
            stats: RwLock::new(CacheStats::default()),
        })
    }

    /// Make every model in `requested` resident and lease them to the caller.
    ///
    /// Missing models are loaded after evicting the least recently used
    /// residents that this request does not name and no live lease holds.
    /// Every requested model ends up stamped with this request's access time.
    ///
    /// When only residents leased by other requests stand in the way, the
    /// request waits for those leases to drop (or fails at once under
    /// [`OverflowPolicy::Reject`]), so overlapping requests never push the
    /// cache past capacity.
    ///
    /// If a load fails, the remaining loads are abandoned and the error is
    /// returned. Evictions and loads that already happened are kept.
    pub async fn ensure_loaded<S: AsRef<str>>(&self, requested: &[S]) -> Result<ModelLease> {
        let requested = match self.normalize_request(requested) {
            Ok(requested) => requested,
            Err(err) => {
                self.stats.write().rejected += 1;
                return Err(err);
            }
        };

        let deadline = Instant::now() + self.config.pin_wait();
        let (mut state, plan) = loop {
            // Registered before the pins are read, so no release is missed
            let unpinned = self.unpinned.notified();

            let state = self.state.lock().await;
            info!(
                resident = state.len(),
                capacity = self.config.capacity,
                "Current loaded model count"
            );

            let plan = AdmissionPlan::build(&requested, &state, self.config.capacity);
            if plan.blocked_by_pins == 0 {
                break (state, plan);
            }

            let exhausted = CoreError::capacity_exhausted(
                plan.missing.len(),
                plan.evict.len(),
                state.len(),
                self.config.capacity,
            );
            if self.config.overflow == OverflowPolicy::Reject {
                self.stats.write().rejected += 1;
                warn!(
                    missing = plan.missing.len(),
                    evictable = plan.evict.len(),
                    resident = state.len(),
                    capacity = self.config.capacity,
                    "Rejecting request: leased models leave no room"
                );
                return Err(exhausted);
            }

            drop(state);
            self.stats.write().pin_waits += 1;
            debug!(
                blocked = plan.blocked_by_pins,
                models = ?requested,
                "Waiting for leased models to be released"
            );
            if timeout_at(deadline, unpinned).await.is_err() {
                self.stats.write().rejected += 1;
                warn!(
                    waited_ms = self.config.pin_wait_ms,
                    models = ?requested,
                    "Gave up waiting for leased models to be released"
                );
                return Err(exhausted);
            }
        };

        if plan.over_capacity > 0 {
            warn!(
                over_capacity = plan.over_capacity,
                resulting = plan.resulting_len(state.len()),
                capacity = self.config.capacity,
                "Cache already holds more than capacity, loading anyway"
            );
        }

        let stamp = state.next_stamp();

        if plan.is_fast_path() {
            for id in &requested {
                state.touch(id, stamp);
            }
            self.stats.write().hits += requested.len() as u64;
            debug!(models = ?requested, "All requested models already resident");
            return self.lease(&state, &requested);
        }

        for id in &plan.evict {
            if self.release(&mut state, id).await {
                self.stats.write().evictions += 1;
                info!(model = %id, "Model unloaded from memory");
            }
        }

        for id in &plan.missing {
            self.stats.write().misses += 1;
            match self.loader.load(id).await {
                Ok(handle) => {
                    state.insert(ModelEntry::new(id.as_str(), handle, stamp));
                    self.resident.store(state.len(), Ordering::Release);
                    self.stats.write().loads += 1;
                    info!(
                        model = %id,
                        resident = state.len(),
                        capacity = self.config.capacity,
                        "Model loaded into memory"
                    );
                }
                Err(source) => {
                    self.stats.write().load_failures += 1;
                    error!(model = %id, error = %source, "Model load failed, abandoning remaining loads");
                    return Err(CoreError::load_failed(id.as_str(), source));
                }
            }
        }

        for id in &plan.already_resident {
            state.touch(id, stamp);
        }
        self.stats.write().hits += plan.already_resident.len() as u64;

        self.lease(&state, &requested)
    }

    /// Warm the cache at startup, at most `capacity` models per request
    pub async fn preload<S: AsRef<str>>(&self, ids: &[S]) -> Result<usize> {
        if ids.len() > self.config.capacity {
            warn!(
                requested = ids.len(),
                capacity = self.config.capacity,
                "Preload list exceeds capacity, earlier models will be evicted"
            );
        }

        for chunk in ids.chunks(self.config.capacity) {
            self.ensure_loaded(chunk).await?;
        }

        Ok(self.resident_count())
    }

    /// Unload every model no request is using. Returns how many were released.
    pub async fn shutdown(&self) -> usize {
        let mut state = self.state.lock().await;
        let (pinned, idle): (Vec<_>, Vec<_>) = state
            .oldest_first()
            .map(|entry| (entry.id().to_string(), entry.is_pinned()))
            .partition(|(_, pinned)| *pinned);

        for (id, _) in &pinned {
            warn!(model = %id, "Model still leased at shutdown, leaving it resident");
        }

        let mut released = 0;
        for (id, _) in &idle {
            if self.release(&mut state, id).await {
                released += 1;
            }
        }

        info!(released, remaining = state.len(), "Model cache shut down");
        released
    }

    /// Remove `id` and hand its model back to the loader.
    ///
    /// The unload runs on its own task and completes even if the caller is
    /// dropped while awaiting it.
    async fn release(&self, state: &mut CacheState, id: &str) -> bool {
        let Some(entry) = state.remove(id) else {
            return false;
        };
        self.resident.store(state.len(), Ordering::Release);

        let loader = Arc::clone(&self.loader);
        let handle = entry.into_handle();
        let unload = tokio::spawn(async move { loader.unload(handle).await });
        if let Err(err) = unload.await {
            error!(model = %id, error = %err, "Model unload task failed");
        }
        true
    }

    /// Validate and de-duplicate a request, keeping first occurrences
    fn normalize_request<S: AsRef<str>>(&self, requested: &[S]) -> Result<Vec<String>> {
        if requested.is_empty() {
            return Err(CoreError::invalid_input(
                "INVALID_EMPTY_REQUEST",
                "No models requested",
                "A request must name at least one model",
                "Pass the model identifiers under the \"models\" key",
            ));
        }

        if requested.len() > self.config.capacity {
            return Err(CoreError::too_many_models(
                requested.len(),
                self.config.capacity,
            ));
        }

        let mut seen = HashSet::with_capacity(requested.len());
        let mut unique = Vec::with_capacity(requested.len());
        for id in requested {
            let id = id.as_ref();
            validate_model_id(id)?;
            if seen.insert(id) {
                unique.push(id.to_string());
            }
        }
        Ok(unique)
    }

    fn lease(&self, state: &CacheState, requested: &[String]) -> Result<ModelLease> {
        let mut lease = ModelLease::new();
        for id in requested {
            let entry = state.get(id).ok_or_else(|| {
                CoreError::internal(format!("model '{}' missing after admission", id))
            })?;
            lease.push(id, Arc::clone(entry.handle()), entry.pin(&self.unpinned));
        }
        Ok(lease)
    }

    /// Configured maximum number of resident models
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Number of resident models, without waiting for in-flight loads
    pub fn resident_count(&self) -> usize {
        self.resident.load(Ordering::Acquire)
    }

    /// Counters since startup
    pub fn stats(&self) -> CacheStats {
        self.stats.read().clone()
    }

    /// Whether `id` is resident right now
    pub async fn contains(&self, id: &str) -> bool {
        self.state.lock().await.contains(id)
    }

    /// Resident models, least recently used first
    pub async fn snapshot(&self) -> Vec<ResidentModel> {
        let state = self.state.lock().await;
        state.oldest_first().map(ResidentModel::from).collect()
    }
}

impl fmt::Debug for ModelCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelCache")
            .field("config", &self.config)
            .field("resident", &self.resident_count())
            .field("stats", &*self.stats.read())
            .finish()
    }
}
