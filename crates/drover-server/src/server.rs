//! Core server implementation

use crate::{
    config::ServerConfig,
    error::{ServerError, ServerResult},
    handlers,
    middleware::{
        concurrency_middleware, logging_middleware, timeout_middleware, ConcurrencyLimiter,
    },
};

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Router,
};
use drover_core::{cache::ModelCache, loader::FsModelLoader, model::ModelLoader};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

/// Main server state
#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<ServerConfig>,
    pub cache: Arc<ModelCache>,
    pub concurrency_limiter: Arc<ConcurrencyLimiter>,
}

impl ServerState {
    /// State backed by artifacts under `models.models_dir`
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let loader = Arc::new(FsModelLoader::new(config.models.models_dir.clone()));
        Self::with_loader(config, loader)
    }

    /// State backed by a caller-supplied loader
    pub fn with_loader(config: ServerConfig, loader: Arc<dyn ModelLoader>) -> ServerResult<Self> {
        config.validate()?;

        let cache = Arc::new(ModelCache::new(config.cache.clone(), loader)?);
        let concurrency_limiter = Arc::new(ConcurrencyLimiter::new(
            config.limits.max_concurrent_requests,
        ));

        Ok(Self {
            config: Arc::new(config),
            cache,
            concurrency_limiter,
        })
    }
}

/// Build the router with all routes and middleware
pub fn create_router(state: ServerState) -> Router {
    let limits = Arc::new(state.config.limits.clone());

    let routes = Router::new()
        // Serving contract
        .route("/invocations", post(handlers::invocations::invocations))
        .route("/ping", get(handlers::health::ping).post(handlers::health::ping))
        // Introspection
        .route("/health", get(handlers::health::health_check))
        .route("/models", get(handlers::health::list_models));

    let router = routes
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(logging_middleware))
                .layer(middleware::from_fn_with_state(
                    Arc::clone(&state.concurrency_limiter),
                    concurrency_middleware,
                ))
                .layer(middleware::from_fn_with_state(limits, timeout_middleware))
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(state.config.limits.max_body_size)),
        )
        .with_state(state.clone());

    match cors_layer(&state.config) {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

fn cors_layer(config: &ServerConfig) -> Option<CorsLayer> {
    if !config.cors.enabled {
        return None;
    }

    let origins = &config.cors.allowed_origins;
    let allow_origin = if origins.iter().any(|origin| origin == "*") {
        AllowOrigin::from(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods(Any)
            .allow_headers(Any),
    )
}

/// Drover HTTP server
pub struct DroverServer {
    state: ServerState,
}

impl DroverServer {
    /// Create a new server instance
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        Ok(Self {
            state: ServerState::new(config)?,
        })
    }

    /// Create a server that loads models through `loader`
    pub fn with_loader(config: ServerConfig, loader: Arc<dyn ModelLoader>) -> ServerResult<Self> {
        Ok(Self {
            state: ServerState::with_loader(config, loader)?,
        })
    }

    /// Get server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    /// Get server state
    pub fn state(&self) -> &ServerState {
        &self.state
    }

    /// Build the router for this server
    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    /// Load the configured preload list
    pub async fn preload(&self) -> ServerResult<()> {
        let preload = &self.state.config.models.preload;
        if preload.is_empty() {
            return Ok(());
        }

        info!(models = ?preload, "Preloading models");
        let resident = self.state.cache.preload(preload.as_slice()).await?;
        info!(resident, "Preload complete");
        Ok(())
    }

    /// Serve until `shutdown` resolves, then release cached models
    pub async fn start<F>(self, shutdown: F) -> ServerResult<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        self.preload().await?;

        let app = self.router();
        let addr = self.state.config.bind;

        info!("Starting Drover server on {}", addr);
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(format!("Server error: {}", e)))?;

        self.shutdown().await;
        Ok(())
    }

    /// Release every model no in-flight request holds
    pub async fn shutdown(&self) {
        info!("Shutting down Drover server");
        let released = self.state.cache.shutdown().await;
        info!(released, "Released cached models");
    }
}

/// Create server from an optional configuration file
pub fn create_server_from_config(config_path: Option<&std::path::Path>) -> ServerResult<DroverServer> {
    let config = match config_path {
        Some(path) => ServerConfig::from_file(path)
            .map_err(|e| ServerError::Config(format!("Failed to load config: {}", e)))?,
        None => ServerConfig::default(),
    };

    DroverServer::new(config)
}

/// Run server until Ctrl-C
pub async fn run_server(server: DroverServer) -> ServerResult<()> {
    let shutdown_signal = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(e) => {
                warn!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    server.start(shutdown_signal).await
}
