//! Drover Core - LRU-bounded model cache
//!
//! This crate owns the set of models resident in an inference process. A
//! request names the models it needs, the [`cache::ModelCache`] loads whatever
//! is missing, evicts the least recently used residents when the configured
//! capacity would be exceeded, and hands back a request-scoped lease over the
//! loaded models.

// Module declarations
pub mod cache;
pub mod config;
pub mod loader;
pub mod model;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    /// A single request named more models than the cache can ever hold
    #[error("Too many models requested [{code}]: {requested} models in request exceeds the maximum of {max} per request")]
    TooManyModelsRequested {
        code: &'static str,
        requested: usize,
        max: usize,
    },

    /// Not enough evictable residents to admit the request without overflowing
    #[error("Capacity exhausted [{code}]: {missing} models must be loaded but only {evictable} of {resident} residents can be evicted (capacity {capacity})")]
    CapacityExhausted {
        code: &'static str,
        missing: usize,
        evictable: usize,
        resident: usize,
        capacity: usize,
    },

    /// The model loader failed for an identifier
    #[error("Model load failed [{code}]: model '{model_id}': {source}")]
    ModelLoadFailed {
        code: &'static str,
        model_id: String,
        #[source]
        source: anyhow::Error,
    },

    /// A loaded model failed to run inference
    #[error("Inference failed [{code}]: model '{model_id}': {message}")]
    Inference {
        code: &'static str,
        model_id: String,
        message: String,
    },

    /// Input validation and parameter errors
    #[error("Invalid input [{code}]: {message}\nContext: {context}\nSuggestion: {suggestion}")]
    InvalidInput {
        code: &'static str,
        message: String,
        context: String,
        suggestion: String,
        parameter_name: Option<String>,
        value: Option<String>,
    },

    /// Configuration parsing and validation errors
    #[error("Configuration error [{code}]: {message}\nContext: {context}\nSuggestion: {suggestion}")]
    Configuration {
        code: &'static str,
        message: String,
        context: String,
        suggestion: String,
        field_name: Option<String>,
    },

    /// Broken internal bookkeeping
    #[error("Internal error [{code}]: {message}")]
    Internal { code: &'static str, message: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Create a per-request ceiling error
    pub fn too_many_models(requested: usize, max: usize) -> Self {
        Self::TooManyModelsRequested {
            code: "CACHE_TOO_MANY_MODELS",
            requested,
            max,
        }
    }

    /// Create a capacity exhaustion error
    pub fn capacity_exhausted(
        missing: usize,
        evictable: usize,
        resident: usize,
        capacity: usize,
    ) -> Self {
        Self::CapacityExhausted {
            code: "CACHE_CAPACITY_EXHAUSTED",
            missing,
            evictable,
            resident,
            capacity,
        }
    }

    /// Wrap a loader failure for the given model
    pub fn load_failed<S: Into<String>>(model_id: S, source: anyhow::Error) -> Self {
        Self::ModelLoadFailed {
            code: "MODEL_LOAD_FAILED",
            model_id: model_id.into(),
            source,
        }
    }

    /// Create an inference error
    pub fn inference<S1, S2>(model_id: S1, message: S2) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Self::Inference {
            code: "MODEL_INFERENCE_FAILED",
            model_id: model_id.into(),
            message: message.into(),
        }
    }

    /// Create an invalid input error with context
    pub fn invalid_input<S1, S2, S3>(
        code: &'static str,
        message: S1,
        context: S2,
        suggestion: S3,
    ) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Self::InvalidInput {
            code,
            message: message.into(),
            context: context.into(),
            suggestion: suggestion.into(),
            parameter_name: None,
            value: None,
        }
    }

    /// Create an invalid input error naming the offending parameter
    pub fn invalid_parameter<S1, S2, S3, S4, S5>(
        code: &'static str,
        message: S1,
        context: S2,
        suggestion: S3,
        param_name: S4,
        value: S5,
    ) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
        S4: Into<String>,
        S5: Into<String>,
    {
        Self::InvalidInput {
            code,
            message: message.into(),
            context: context.into(),
            suggestion: suggestion.into(),
            parameter_name: Some(param_name.into()),
            value: Some(value.into()),
        }
    }

    /// Create a configuration error for a specific field
    pub fn configuration<S1, S2, S3, S4>(
        code: &'static str,
        message: S1,
        context: S2,
        suggestion: S3,
        field_name: S4,
    ) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
        S4: Into<String>,
    {
        Self::Configuration {
            code,
            message: message.into(),
            context: context.into(),
            suggestion: suggestion.into(),
            field_name: Some(field_name.into()),
        }
    }

    pub(crate) fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            code: "INTERNAL_CACHE_STATE",
            message: message.into(),
        }
    }

    /// Get the error code for programmatic handling
    pub fn code(&self) -> &'static str {
        match self {
            Self::TooManyModelsRequested { code, .. } => code,
            Self::CapacityExhausted { code, .. } => code,
            Self::ModelLoadFailed { code, .. } => code,
            Self::Inference { code, .. } => code,
            Self::InvalidInput { code, .. } => code,
            Self::Configuration { code, .. } => code,
            Self::Internal { code, .. } => code,
        }
    }

    /// Whether the caller caused the error; such errors never mutate the cache
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::TooManyModelsRequested { .. } | Self::InvalidInput { .. }
        )
    }
}

/// Prelude module for common imports
pub mod prelude {
    pub use crate::{
        cache::{CacheStats, ModelCache, ModelLease, ResidentModel},
        config::{CacheConfig, OverflowPolicy},
        loader::{DetectionModel, FsModelLoader},
        model::{Model, ModelHandle, ModelKind, ModelLoader},
        CoreError, Result,
    };
}
