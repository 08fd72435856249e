//! Heap Analysis Application Layer
//!
//! `HeapModel`: the heap operations transfer functions perform (allocation,
//! field load/store, container mutation, invalidation at unknown calls).

pub mod heap_model;

pub use heap_model::{
    check_bounds, is_known_mutating, BoundsCheck, HeapModel, KNOWN_MUTATING_METHODS,
};
