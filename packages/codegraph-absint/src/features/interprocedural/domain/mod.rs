//! Interprocedural domain: program states, summaries, diagnostics, report

pub mod context;
pub mod diagnostic;
pub mod program_state;
pub mod report;
pub mod summary;

pub use context::{AnalysisContext, PublishedSummaries, SummaryView};
pub use diagnostic::{Certainty, Diagnostic, DiagnosticKind, Severity};
pub use program_state::{ProgramState, RETURN_SLOT};
pub use report::{AnalysisReport, AnalysisStats};
pub use summary::FunctionSummary;
