//! Configuration for the model cache

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{CoreError, Result};

/// Models held at once when nothing else is configured
pub const DEFAULT_CAPACITY: usize = 20;

/// How long a request waits for leased models to be released
pub const DEFAULT_PIN_WAIT_MS: u64 = 30_000;

/// Model cache configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of resident models, also the per-request ceiling
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// What to do when leased models leave no room for a request
    #[serde(default)]
    pub overflow: OverflowPolicy,

    /// Upper bound on a single request's wait for leases, in milliseconds
    #[serde(default = "default_pin_wait_ms")]
    pub pin_wait_ms: u64,
}

/// Behavior when residents pinned by other in-flight requests are all that
/// stands between a request and capacity.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Wait for leases to drop, then plan again. Gives up with
    /// `CapacityExhausted` after `pin_wait_ms`.
    #[default]
    Wait,
    /// Fail the request with `CapacityExhausted` before touching the cache
    Reject,
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_pin_wait_ms() -> u64 {
    DEFAULT_PIN_WAIT_MS
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            overflow: OverflowPolicy::default(),
            pin_wait_ms: default_pin_wait_ms(),
        }
    }
}

impl CacheConfig {
    /// Config with the given capacity and default overflow handling
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    pub fn pin_wait(&self) -> Duration {
        Duration::from_millis(self.pin_wait_ms)
    }

    /// Validate the cache configuration
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(CoreError::configuration(
                "CONFIG_INVALID_CAPACITY",
                "Cache capacity must be greater than 0",
                "cache.capacity = 0",
                "Set cache.capacity to the number of models that fit in memory",
                "cache.capacity",
            ));
        }

        Ok(())
    }
}
