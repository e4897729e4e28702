//! Model and loader interfaces
//!
//! The cache never looks inside a model. It only needs an identifier, a way
//! to run inference for the serving layer, and a loader that can create and
//! release models.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fmt, sync::Arc};

use crate::{CoreError, Result};

/// Longest identifier accepted by the cache
pub const MAX_MODEL_ID_LEN: usize = 256;

/// Kinds of model the server knows how to serve
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Object detection model
    Detection,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Detection => write!(f, "detection"),
        }
    }
}

/// A loaded, inference-ready model
#[async_trait]
pub trait Model: Send + Sync {
    /// Identifier the model was loaded under
    fn id(&self) -> &str;

    /// Model kind
    fn kind(&self) -> ModelKind;

    /// Run inference on an opaque JSON payload
    async fn infer(&self, input: &Value) -> Result<Value>;
}

/// Shared ownership of a loaded model
pub type ModelHandle = Arc<dyn Model>;

/// Creates and releases models on behalf of the cache
#[async_trait]
pub trait ModelLoader: Send + Sync {
    /// Load the model named `model_id`. May perform disk or network I/O.
    async fn load(&self, model_id: &str) -> anyhow::Result<ModelHandle>;

    /// Release a model the cache has evicted.
    ///
    /// Cleanup is best effort: implementations log their own failures.
    async fn unload(&self, model: ModelHandle);
}

/// Check that a model identifier is usable as a cache key and as a path
/// component.
pub fn validate_model_id(model_id: &str) -> Result<()> {
    let reason = if model_id.is_empty() {
        Some("identifier is empty")
    } else if model_id.len() > MAX_MODEL_ID_LEN {
        Some("identifier is too long")
    } else if model_id == "." || model_id.contains("..") {
        Some("identifier contains a relative path segment")
    } else if model_id.contains('/') || model_id.contains('\\') {
        Some("identifier contains a path separator")
    } else if model_id.chars().any(char::is_control) {
        Some("identifier contains a control character")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(CoreError::invalid_parameter(
            "INVALID_MODEL_ID",
            format!("Invalid model identifier: {}", reason),
            format!("Identifiers must be 1-{} characters naming a single model", MAX_MODEL_ID_LEN),
            "Use the model's artifact name, e.g. \"resnet50\"",
            "models",
            model_id,
        )),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_model_ids() {
        for id in ["resnet50", "yolo-v8.small", "model_1", "A"] {
            assert!(validate_model_id(id).is_ok(), "{id} should be valid");
        }
    }

    #[test]
    fn test_invalid_model_ids() {
        let too_long = "m".repeat(MAX_MODEL_ID_LEN + 1);
        for id in ["", ".", "..", "a/b", "..\\x", "a\nb", too_long.as_str()] {
            let err = validate_model_id(id).unwrap_err();
            assert_eq!(err.code(), "INVALID_MODEL_ID");
        }
    }

    #[test]
    fn test_model_kind_display() {
        assert_eq!(ModelKind::Detection.to_string(), "detection");
        assert_eq!(
            serde_json::to_value(ModelKind::Detection).unwrap(),
            serde_json::json!("detection")
        );
    }
}
