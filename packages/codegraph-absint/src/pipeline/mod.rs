//! Pipeline orchestration

pub mod analyze;

pub use analyze::{analyze, analyze_with_cancellation};
