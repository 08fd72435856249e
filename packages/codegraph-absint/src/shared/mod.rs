//! Shared module - Common types and utilities
//!
//! Syntax model, function arena and cancellation shared by every feature.

pub mod cancellation;
pub mod models;

// Re-exports for convenience
pub use cancellation::CancellationToken;
pub use models::*;
