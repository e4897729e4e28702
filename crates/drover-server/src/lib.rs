//! Drover Server - HTTP serving layer for the Drover model cache
//!
//! Exposes `/invocations` (load the requested models, then run them on the
//! request body) and `/ping`, plus health and cache introspection routes.

/// Version of the drover-server crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod server;

// Re-export commonly used types
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{create_router, DroverServer, ServerState};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        config::*,
        error::*,
        handlers::*,
        middleware::*,
        server::*,
    };
}
