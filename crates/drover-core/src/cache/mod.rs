//! Resident model cache with least-recently-used eviction.
//!
//! - [`recency`]: logical clock and the oldest-first index
//! - [`entry`]: a resident model and its bookkeeping
//! - [`state`]: the resident map kept in sync with the recency index
//! - [`policy`]: the pure load/evict decision for one request
//! - [`lease`]: request-scoped borrows that pin entries against eviction
//! - [`manager`]: [`ModelCache`], which serializes all of the above

pub mod entry;
pub mod lease;
pub mod manager;
pub mod policy;
pub mod recency;
pub mod state;
pub mod types;

pub use entry::ModelEntry;
pub use lease::ModelLease;
pub use manager::ModelCache;
pub use policy::AdmissionPlan;
pub use recency::Stamp;
pub use types::{CacheStats, ResidentModel};
