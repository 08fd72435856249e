//! # Interprocedural Analysis
//!
//! Summary-based abstract interpretation over the call-graph condensation:
//! - `domain`: program states (environment × heap), function summaries,
//!   diagnostics and the final report
//! - `infrastructure`: transfer functions, branch refinement, builtins
//! - `application`: the bottom-up/top-down SCC driver
//!
//! ## Academic References
//! - Sharir & Pnueli "Two Approaches to Interprocedural Data Flow Analysis" (1981)
//! - Cousot & Cousot "Modular Static Program Analysis" (CC 2002)

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{InterproceduralAnalyzer, InterproceduralOutcome};
pub use domain::{
    AnalysisContext, AnalysisReport, AnalysisStats, Certainty, Diagnostic, DiagnosticKind,
    FunctionSummary, ProgramState, Severity, RETURN_SLOT,
};
pub use infrastructure::{Builtin, CallObserver, InterproceduralTransfer};
