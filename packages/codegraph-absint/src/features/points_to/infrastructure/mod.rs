//! Infrastructure layer for Points-to Analysis
//!
//! - **AndersenSolver**: field-sensitive inclusion-based solver with
//!   on-the-fly call resolution

pub mod andersen_solver;

pub use andersen_solver::{AndersenSolver, SolverEnv};
