//! Server configuration

use drover_core::config::CacheConfig;
use serde::{Deserialize, Serialize};
use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::error::{ServerError, ServerResult};

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "DROVER";

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Server binding address
    pub bind: SocketAddr,

    /// Model cache configuration
    pub cache: CacheConfig,

    /// Model location and warm-up
    pub models: ModelsConfig,

    /// Request limits
    pub limits: RequestLimits,

    /// CORS configuration
    pub cors: CorsConfig,
}

/// Model location and warm-up
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelsConfig {
    /// Directory holding one artifact per model identifier
    pub models_dir: PathBuf,

    /// Models to load before accepting requests
    pub preload: Vec<String>,
}

/// Request size and time limits
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RequestLimits {
    /// Maximum request body size in bytes
    pub max_body_size: usize,

    /// Request timeout in seconds, model loading included
    pub request_timeout: u64,

    /// Maximum concurrent requests
    pub max_concurrent_requests: usize,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CorsConfig {
    /// Enable CORS
    pub enabled: bool,

    /// Allowed origins ("*" means any)
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            cache: CacheConfig::default(),
            models: ModelsConfig::default(),
            limits: RequestLimits::default(),
            cors: CorsConfig::default(),
        }
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("./models"),
            preload: Vec::new(),
        }
    }
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            max_body_size: 10 * 1024 * 1024, // 10MB
            request_timeout: 3600,           // loads can be slow
            max_concurrent_requests: 100,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            allowed_origins: vec!["*".to_string()],
        }
    }
}

impl RequestLimits {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

impl ServerConfig {
    /// Load configuration from file, with `DROVER_` environment overrides
    /// (nested keys use `__`, e.g. `DROVER_CACHE__CAPACITY=8`)
    pub fn from_file(path: &Path) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Save configuration to file
    pub fn to_file(&self, path: &Path) -> ServerResult<()> {
        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ServerError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, toml_string)?;
        Ok(())
    }

    /// Check values the type system cannot
    pub fn validate(&self) -> ServerResult<()> {
        self.cache.validate()?;

        if self.limits.max_body_size == 0 {
            return Err(ServerError::Config(
                "limits.max_body_size must be greater than 0".to_string(),
            ));
        }
        if self.limits.request_timeout == 0 {
            return Err(ServerError::Config(
                "limits.request_timeout must be greater than 0".to_string(),
            ));
        }
        if self.limits.max_concurrent_requests == 0 {
            return Err(ServerError::Config(
                "limits.max_concurrent_requests must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
