//! # Points-to Analysis
//!
//! Flow-insensitive, allocation-site based may-alias analysis:
//! - heap objects are (allocation site, k-limited context) pairs
//! - field-sensitive through `FieldKey::Attr` and summarized `Elements`
//! - method calls are dispatched on the fly, so `self` only receives the
//!   receiver objects whose type resolves to that method
//!
//! ## Academic References
//! - Andersen, L. O. "Program Analysis and Specialization for C" (PhD 1994)
//! - Pearce et al. "Efficient Field-Sensitive Pointer Analysis" (CC 2004)
//! - Smaragdakis et al. "Pick Your Contexts Well" (POPL 2011)

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::PointerAnalysis;
pub use domain::{
    ContextId, FieldKey, HeapObject, HeapObjectId, ObjectKind, PointsToGraph, PointsToSet,
    PointsToStats,
};
