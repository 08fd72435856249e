//! Application layer for Points-to Analysis
//!
//! - **PointerAnalysis**: constraint generation over the program and the
//!   solve loop that reaches new calling contexts

pub mod analyzer;

pub use analyzer::PointerAnalysis;
