//! HTTP request handlers

pub mod health;
pub mod invocations;

// Re-export handler modules for convenience
pub use health::*;
pub use invocations::*;
