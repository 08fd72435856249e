pub mod abstract_state;

pub use abstract_state::{AbstractState, Environment};
