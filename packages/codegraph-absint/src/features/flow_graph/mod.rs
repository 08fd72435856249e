//! Control-flow graphs
//!
//! One graph per function body: basic blocks of statement references,
//! branch/loop edges with their kinds, dense deterministic numbering.

pub mod domain;
pub mod infrastructure;

pub use domain::*;
pub use infrastructure::CfgBuilder;
