//! Intraprocedural dataflow
//!
//! - `domain`: `AbstractState`, the per-point variable environments
//! - `ports`: `TransferFunction`, the seam between solver and semantics
//! - `infrastructure`: the worklist fixpoint solver

pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use domain::{AbstractState, Environment};
pub use infrastructure::{FixpointResult, SolverConfig, WorklistSolver};
pub use ports::TransferFunction;
