pub mod worklist_solver;

pub use worklist_solver::{FixpointResult, SolverConfig, WorklistSolver};
