pub mod builder;
pub mod scc;

pub use builder::CallGraphBuilder;
pub use scc::{compute_sccs, condense};
