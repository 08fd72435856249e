//! Domain models for Points-to Analysis
//!
//! - HeapObject: allocation site × context abstraction of runtime objects
//! - Context: k-limited call strings
//! - Constraint: ALLOC, COPY, LOAD, STORE and on-the-fly CALL constraints
//! - PointsToGraph: the solved relation, collapsed over contexts

pub mod abstract_location;
pub mod constraint;
pub mod context;
pub mod points_to_graph;

pub use abstract_location::{HeapObject, HeapObjectId, ObjectKind};
pub use constraint::{CallConstraint, CallTarget, Constraint, FieldKey, PtrVar};
pub use context::{ContextId, ContextTable};
pub use points_to_graph::{PointsToGraph, PointsToSet, PointsToStats};
