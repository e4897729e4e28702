//! Middleware components for the server

use crate::{config::RequestLimits, error::ServerError};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, warn};

/// Request timeout middleware
///
/// The deadline covers the whole request, model loading included.
pub async fn timeout_middleware(
    State(limits): State<Arc<RequestLimits>>,
    request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    match tokio::time::timeout(limits.request_timeout(), next.run(request)).await {
        Ok(response) => Ok(response),
        Err(_) => {
            warn!(timeout_secs = limits.request_timeout, "Request timed out");
            Err(ServerError::Timeout(limits.request_timeout))
        }
    }
}

/// Logging middleware
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    info!(method = %method, uri = %uri, "Request started");

    let response = next.run(request).await;
    let elapsed = start.elapsed();

    info!(
        method = %method,
        uri = %uri,
        status = %response.status(),
        elapsed_ms = %elapsed.as_millis(),
        "Request completed"
    );

    response
}

/// Caps the number of requests in flight
#[derive(Debug)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
}

impl ConcurrencyLimiter {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
        }
    }

    /// Permits not currently held
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub async fn middleware(&self, request: Request, next: Next) -> Result<Response, ServerError> {
        let _permit = self.semaphore.acquire().await.map_err(|_| {
            ServerError::Internal("Failed to acquire concurrency permit".to_string())
        })?;

        Ok(next.run(request).await)
    }
}

/// Concurrency limiting middleware
pub async fn concurrency_middleware(
    State(limiter): State<Arc<ConcurrencyLimiter>>,
    request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    limiter.middleware(request, next).await
}
