//! Shared test doubles for drover-core integration tests

#![allow(dead_code)]

use std::{collections::HashSet, sync::Arc, time::Duration};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use drover_core::{
    model::{Model, ModelHandle, ModelKind, ModelLoader},
    Result,
};

/// Model that echoes its input
#[derive(Debug)]
pub struct EchoModel {
    id: String,
}

#[async_trait]
impl Model for EchoModel {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> ModelKind {
        ModelKind::Detection
    }

    async fn infer(&self, input: &Value) -> Result<Value> {
        Ok(json!({ "model": self.id, "input": input }))
    }
}

/// Loader that records every call and can be told to fail or stall
#[derive(Default)]
pub struct RecordingLoader {
    loads: Mutex<Vec<String>>,
    unloads: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
    delay: Option<Duration>,
    unload_delay: Option<Duration>,
}

impl RecordingLoader {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Self::default()
        })
    }

    /// Unloads finish, and are recorded, only after `delay`
    pub fn with_unload_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            unload_delay: Some(delay),
            ..Self::default()
        })
    }

    pub fn fail_on(&self, id: &str) {
        self.failing.lock().insert(id.to_string());
    }

    /// Load attempts, including failed ones, in call order
    pub fn loads(&self) -> Vec<String> {
        self.loads.lock().clone()
    }

    pub fn unloads(&self) -> Vec<String> {
        self.unloads.lock().clone()
    }

    pub fn load_count(&self, id: &str) -> usize {
        self.loads.lock().iter().filter(|loaded| *loaded == id).count()
    }
}

#[async_trait]
impl ModelLoader for RecordingLoader {
    async fn load(&self, model_id: &str) -> anyhow::Result<ModelHandle> {
        self.loads.lock().push(model_id.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().contains(model_id) {
            anyhow::bail!("weights for {} are corrupt", model_id);
        }
        Ok(Arc::new(EchoModel {
            id: model_id.to_string(),
        }))
    }

    async fn unload(&self, model: ModelHandle) {
        if let Some(delay) = self.unload_delay {
            tokio::time::sleep(delay).await;
        }
        self.unloads.lock().push(model.id().to_string());
    }
}

/// Resident identifiers, least recently used first
pub async fn resident_order(cache: &drover_core::cache::ModelCache) -> Vec<String> {
    cache.snapshot().await.into_iter().map(|model| model.id).collect()
}
