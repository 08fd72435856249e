//! Lattice framework and value domains
//!
//! - `Lattice`: bottom/top/join/meet/leq/widen interface
//! - `Sign`, `Nullability`, `Range`: the concrete domains
//! - `AbstractValue`: their reduced product, the value type the transfer
//!   functions compute with
//! - `DomainSet`: which domains a run tracks

pub mod abstract_value;
pub mod domain_set;
pub mod lattice;
pub mod nullability;
pub mod range;
pub mod sign;

pub use abstract_value::AbstractValue;
pub use domain_set::{Domain, DomainSet};
pub use lattice::{join_all, Lattice};
pub use nullability::Nullability;
pub use range::{Bound, Range};
pub use sign::Sign;
