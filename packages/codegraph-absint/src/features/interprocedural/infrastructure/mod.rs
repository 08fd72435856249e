//! Interprocedural semantics: builtins, branch refinement, transfer

pub mod builtins;
pub mod condition;
pub mod transfer;

pub use builtins::{is_known_pure, Builtin, KNOWN_PURE_METHODS};
pub use condition::refine_condition;
pub use transfer::{CallInput, CallObserver, InterproceduralTransfer, Observations};
