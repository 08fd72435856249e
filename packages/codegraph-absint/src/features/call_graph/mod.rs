//! Call graph construction and SCC condensation
//!
//! Built once per program: direct and constructor calls are resolved
//! statically, attribute calls are recorded as virtual sites for
//! [`VirtualDispatchResolver`](crate::features::virtual_dispatch::VirtualDispatchResolver)
//! to refine.

pub mod domain;
pub mod infrastructure;

pub use domain::{CallGraph, CallKind, CallSite, Scc};
pub use infrastructure::{condense, CallGraphBuilder};
