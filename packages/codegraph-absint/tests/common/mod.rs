//! Common test utilities for codegraph-absint
//!
//! Shared program builders, report assertions and a concrete interpreter
//! used as a soundness oracle by the integration tests.

#![allow(dead_code)]

mod assertions;
mod builders;
mod oracle;

// Re-export all utilities
pub use assertions::*;
pub use builders::*;
pub use oracle::*;
