//! Feature modules
//!
//! Each feature is a vertical slice, split where it pays off into:
//! - domain/         - Values and data structures (no analysis driving)
//! - ports/          - Traits at the seams between features
//! - application/    - Drivers that run an analysis end to end
//! - infrastructure/ - Solvers, builders and transfer functions
//!
//! Dependency order: lattice → flow_graph → dataflow → call_graph →
//! virtual_dispatch → points_to → heap_analysis → interprocedural.

// Abstract value domains (sign, nullability, range) and the lattice trait
pub mod lattice;

// Per-function control-flow graphs over the immutable syntax tree
pub mod flow_graph;

// Intraprocedural worklist fixpoint solver
pub mod dataflow;

// Static call graph with SCC condensation (petgraph)
pub mod call_graph;

// Class hierarchy and receiver-type based dispatch
pub mod virtual_dispatch;

// Allocation-site Andersen-style pointer analysis
pub mod points_to;

// Abstract heap: field values, strong/weak updates, summary effects
pub mod heap_analysis;

// Summary-based interprocedural abstract interpretation
pub mod interprocedural;
