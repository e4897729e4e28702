//! Filesystem model loader
//!
//! Resolves a model identifier to an artifact under a models directory, the
//! way SageMaker multi-model containers lay weights out under
//! `/opt/ml/models`. Turning the artifact into real weights belongs to the
//! model kind; the detection model here only records what it was built from.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{debug, info};

use crate::{
    model::{validate_model_id, Model, ModelHandle, ModelKind, ModelLoader},
    Result,
};

/// Detection model backed by an on-disk artifact
#[derive(Debug)]
pub struct DetectionModel {
    id: String,
    artifact_bytes: u64,
    loaded_at: DateTime<Utc>,
}

impl DetectionModel {
    pub fn new(id: impl Into<String>, artifact_bytes: u64) -> Self {
        Self {
            id: id.into(),
            artifact_bytes,
            loaded_at: Utc::now(),
        }
    }
}

#[async_trait]
impl Model for DetectionModel {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> ModelKind {
        ModelKind::Detection
    }

    async fn infer(&self, input: &Value) -> Result<Value> {
        Ok(json!({
            "model": self.id,
            "kind": self.kind(),
            "artifact_bytes": self.artifact_bytes,
            "loaded_at": self.loaded_at.to_rfc3339(),
            "input": input,
        }))
    }
}

/// Loads models from `<models_dir>/<model_id>`
#[derive(Debug, Clone)]
pub struct FsModelLoader {
    models_dir: PathBuf,
}

impl FsModelLoader {
    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
        }
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Size of a file artifact, or the summed size of a directory's files
    async fn artifact_size(path: &Path) -> anyhow::Result<u64> {
        let metadata = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("model artifact not found at {}", path.display()))?;

        if !metadata.is_dir() {
            return Ok(metadata.len());
        }

        let mut total = 0u64;
        let mut entries = tokio::fs::read_dir(path)
            .await
            .with_context(|| format!("cannot read model directory {}", path.display()))?;
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if metadata.is_file() {
                total += metadata.len();
            }
        }
        Ok(total)
    }
}

#[async_trait]
impl ModelLoader for FsModelLoader {
    async fn load(&self, model_id: &str) -> anyhow::Result<ModelHandle> {
        validate_model_id(model_id)?;

        let artifact = self.models_dir.join(model_id);
        info!(model = %model_id, path = %artifact.display(), "Loading model into memory");

        let artifact_bytes = Self::artifact_size(&artifact).await?;
        Ok(Arc::new(DetectionModel::new(model_id, artifact_bytes)))
    }

    async fn unload(&self, model: ModelHandle) {
        let model_id = model.id().to_string();
        drop(model);
        debug!(model = %model_id, "Released model resources");
    }
}
