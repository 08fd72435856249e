//! Interprocedural driver

pub mod analyzer;

pub use analyzer::{InterproceduralAnalyzer, InterproceduralOutcome};
