//! Heap Analysis Domain
//!
//! - `HeapValue` / `Field`: what a (heap object, field) slot holds
//! - `HeapState`: the flow-sensitive heap, a lattice element per program point
//! - `HeapEffects`: per-function heap deltas replayed at call sites

pub mod effects;
pub mod heap_state;
pub mod heap_value;

pub use effects::{Allocation, HeapEffects, HeapWrite};
pub use heap_state::{HeapState, Slot};
pub use heap_value::{Field, HeapValue};
