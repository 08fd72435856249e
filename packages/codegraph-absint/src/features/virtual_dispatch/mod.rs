//! Class hierarchy analysis and virtual dispatch
//!
//! - `ClassHierarchy`: class → bases/methods, nearest-ancestor lookup
//! - `VirtualDispatchResolver`: receiver-type driven call targets, written
//!   back into the call graph

pub mod class_hierarchy;
pub mod resolver;

pub use class_hierarchy::{ClassHierarchy, ClassInfo, CONSTRUCTOR};
pub use resolver::VirtualDispatchResolver;
